//! legacy-redirect: Retarget legacy skin API literals to a local shim
//!
//! Glue between the rewrite engine (`redirect-core`) and the lazily started
//! compatibility server (`redirect-shim`). The artifact pipeline feeds
//! serialized artifacts in and re-emits only those that changed.

pub use redirect_core::{
    CodeArtifact, ConstantMapper, LdcTransform, LegacyUrlMapper, TransformPipeline, TransformUnit,
};
pub use redirect_shim::{create_transform_unit, ShimConfig, ShimHandle, SkinRedirectUnit};

use anyhow::{Context, Result};

/// Pipeline holding the skin redirect unit for the given backend
pub fn skin_redirect_pipeline(config: ShimConfig) -> TransformPipeline {
    TransformPipeline::new().with_unit(create_transform_unit(Some(config)))
}

/// Rewrite one serialized artifact.
///
/// Returns the re-emitted bytes, or `None` when nothing changed and the
/// original bytes can be used as they are.
pub fn rewrite_serialized(pipeline: &TransformPipeline, data: &[u8]) -> Result<Option<Vec<u8>>> {
    let artifact = CodeArtifact::from_json(data).context("decoding artifact")?;
    let Some(rewritten) = pipeline
        .rewrite(&artifact.name, &artifact)
        .with_context(|| format!("rewriting {}", artifact.name))?
    else {
        return Ok(None);
    };
    Ok(Some(rewritten.to_json()?))
}
