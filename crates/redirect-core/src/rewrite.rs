//! Rewrite engine: pinpoint substitution of literal string loads
//!
//! Every `Ldc` of a string constant is offered to a [`ConstantMapper`]. When the
//! mapper returns a different value, only that operand is replaced; offsets,
//! jump targets, and all other instructions are left exactly as they were.

use crate::artifact::{CodeArtifact, Constant, Instruction};
use crate::error::TransformError;
use crate::mapper::ConstantMapper;

/// One rewrite rule applied to an artifact.
///
/// Returns `Ok(None)` when the artifact needs no re-emission, or the rewritten
/// artifact otherwise. `on_modified` is invoked once per substitution, and
/// only when the whole artifact was rewritten successfully.
pub trait TransformUnit: Send + Sync {
    fn transform(
        &self,
        artifact_name: &str,
        artifact: &CodeArtifact,
        on_modified: &mut dyn FnMut(),
    ) -> Result<Option<CodeArtifact>, TransformError>;
}

/// Substitutes string literals according to a mapper
pub struct LdcTransform<M> {
    mapper: M,
}

impl<M: ConstantMapper> LdcTransform<M> {
    pub fn new(mapper: M) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }
}

impl<M: ConstantMapper> TransformUnit for LdcTransform<M> {
    fn transform(
        &self,
        artifact_name: &str,
        artifact: &CodeArtifact,
        on_modified: &mut dyn FnMut(),
    ) -> Result<Option<CodeArtifact>, TransformError> {
        // Work on a copy: a mapper failure halfway through must leave nothing behind
        let mut rewritten: Option<CodeArtifact> = None;
        // (method, offset, original); reported only once the whole artifact succeeded
        let mut applied: Vec<(usize, usize, &str)> = Vec::new();

        for (m, method) in artifact.methods.iter().enumerate() {
            for (i, insn) in method.instructions.iter().enumerate() {
                let Some(original) = insn.string_literal() else {
                    continue;
                };

                let replacement =
                    self.mapper
                        .map(original)
                        .map_err(|source| TransformError::Mapper {
                            artifact: artifact_name.to_string(),
                            source,
                        })?;

                let Some(replacement) = replacement.filter(|r| r != original) else {
                    continue;
                };

                let target = rewritten.get_or_insert_with(|| artifact.clone());
                target.methods[m].instructions[i] = Instruction::Ldc {
                    constant: Constant::Str(replacement),
                };
                applied.push((m, i, original));
            }
        }

        if let Some(target) = &rewritten {
            for (m, i, original) in applied {
                let replacement = target.methods[m].instructions[i]
                    .string_literal()
                    .unwrap_or_default();
                tracing::info!(
                    artifact = artifact_name,
                    method = %target.methods[m].name,
                    offset = i,
                    "transform [{}] to [{}]",
                    original,
                    replacement
                );
                on_modified();
            }
        }

        Ok(rewritten)
    }
}

/// Ordered chain of transform units applied to each artifact
#[derive(Default)]
pub struct TransformPipeline {
    units: Vec<Box<dyn TransformUnit>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, unit: impl TransformUnit + 'static) -> Self {
        self.units.push(Box::new(unit));
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Run every unit in order. Returns `None` if no unit changed anything,
    /// so the caller can skip re-emitting the artifact.
    pub fn rewrite(
        &self,
        artifact_name: &str,
        artifact: &CodeArtifact,
    ) -> Result<Option<CodeArtifact>, TransformError> {
        let mut current: Option<CodeArtifact> = None;
        let mut modifications = 0usize;

        for unit in &self.units {
            let input = current.as_ref().unwrap_or(artifact);
            let mut on_modified = || modifications += 1;
            if let Some(next) = unit.transform(artifact_name, input, &mut on_modified)? {
                current = Some(next);
            }
        }

        if modifications == 0 {
            tracing::trace!(artifact = artifact_name, "No transformation applied");
            return Ok(None);
        }

        tracing::debug!(
            artifact = artifact_name,
            modifications,
            "Artifact transformed"
        );
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Method;
    use crate::error::MapperError;
    use crate::mapper::{LegacyUrlMapper, StaticRoot};

    const LOCAL: &str = "http://127.0.0.1:4242";

    fn legacy_mapper() -> LegacyUrlMapper<StaticRoot> {
        LegacyUrlMapper::new(StaticRoot(LOCAL.to_string()))
    }

    fn skin_loader() -> CodeArtifact {
        CodeArtifact::new("SkinLoader")
            .with_method(Method::new("<clinit>", "()V").with_instructions(vec![
                Instruction::ldc_str("http://skins.minecraft.net"),
                Instruction::Raw {
                    opcode: 0xb3,
                    operands: vec![0, 7],
                },
                Instruction::Return,
            ]))
            .with_method(Method::new("url", "(Ljava/lang/String;)Ljava/lang/String;").with_instructions(vec![
                Instruction::ldc_str("http://s3.amazonaws.com/MinecraftSkins/"),
                Instruction::ldc(Constant::Long(7)),
                Instruction::ldc_str("User-Agent"),
                Instruction::Jump { target: 4 },
                Instruction::Invoke {
                    owner: "java/lang/StringBuilder".into(),
                    name: "append".into(),
                    descriptor: "(Ljava/lang/String;)Ljava/lang/StringBuilder;".into(),
                },
                Instruction::Return,
            ]))
    }

    #[test]
    fn test_rewrites_matching_literals_only() {
        let transform = LdcTransform::new(legacy_mapper());
        let artifact = skin_loader();
        let mut modified = 0;

        let out = transform
            .transform("SkinLoader", &artifact, &mut || modified += 1)
            .unwrap()
            .expect("artifact should be rewritten");

        assert_eq!(modified, 2);
        let literals: Vec<_> = out.string_constants().collect();
        assert_eq!(
            literals,
            vec![
                LOCAL,
                "http://127.0.0.1:4242/MinecraftSkins/",
                "User-Agent"
            ]
        );
        assert!(artifact.same_shape(&out));
        assert_eq!(out.methods[1].instructions[1], Instruction::ldc(Constant::Long(7)));
    }

    #[test]
    fn test_no_match_returns_none_without_callback() {
        let transform = LdcTransform::new(legacy_mapper());
        let artifact = CodeArtifact::new("Plain").with_method(
            Method::new("run", "()V").with_instructions(vec![
                Instruction::ldc_str("https://api.mojang.com/"),
                Instruction::ldc(Constant::Type("java/lang/Object".into())),
                Instruction::Return,
            ]),
        );
        let mut modified = 0;

        let out = transform
            .transform("Plain", &artifact, &mut || modified += 1)
            .unwrap();

        assert!(out.is_none());
        assert_eq!(modified, 0);
    }

    #[test]
    fn test_identical_replacement_is_noop() {
        let transform = LdcTransform::new(|s: &str| -> Result<Option<String>, MapperError> {
            Ok(Some(s.to_string()))
        });
        let mut modified = 0;

        let out = transform
            .transform("SkinLoader", &skin_loader(), &mut || modified += 1)
            .unwrap();

        assert!(out.is_none());
        assert_eq!(modified, 0);
    }

    #[test]
    fn test_mapper_failure_rejects_whole_artifact() {
        let transform = LdcTransform::new(|s: &str| -> Result<Option<String>, MapperError> {
            if s.contains("s3.amazonaws.com") {
                Err(MapperError::new("shim failed to start"))
            } else {
                Ok(Some("replaced".to_string()))
            }
        });
        let artifact = skin_loader();
        let mut modified = 0;

        let err = transform
            .transform("SkinLoader", &artifact, &mut || modified += 1)
            .unwrap_err();

        assert!(matches!(err, TransformError::Mapper { ref artifact, .. } if artifact == "SkinLoader"));
        // Input untouched and nothing reported, even though the first literal
        // was mapped before the failure
        assert_eq!(artifact, skin_loader());
        assert_eq!(modified, 0);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let transform = LdcTransform::new(legacy_mapper());
        let first = transform
            .transform("SkinLoader", &skin_loader(), &mut || {})
            .unwrap()
            .unwrap();

        let mut modified = 0;
        let second = transform
            .transform("SkinLoader", &first, &mut || modified += 1)
            .unwrap();

        assert!(second.is_none());
        assert_eq!(modified, 0);
    }

    #[test]
    fn test_pipeline_chains_units() {
        let pipeline = TransformPipeline::new()
            .with_unit(LdcTransform::new(legacy_mapper()))
            .with_unit(LdcTransform::new(
                |s: &str| -> Result<Option<String>, MapperError> {
                    Ok((s == "User-Agent").then(|| "X-Agent".to_string()))
                },
            ));
        assert_eq!(pipeline.len(), 2);

        let out = pipeline.rewrite("SkinLoader", &skin_loader()).unwrap().unwrap();
        let literals: Vec<_> = out.string_constants().collect();
        assert_eq!(
            literals,
            vec![LOCAL, "http://127.0.0.1:4242/MinecraftSkins/", "X-Agent"]
        );
    }

    #[test]
    fn test_pipeline_untouched_artifact() {
        let pipeline = TransformPipeline::new().with_unit(LdcTransform::new(legacy_mapper()));
        let artifact = CodeArtifact::new("Empty").with_method(Method::new("run", "()V"));
        assert!(pipeline.rewrite("Empty", &artifact).unwrap().is_none());
        assert!(TransformPipeline::new().is_empty());
    }
}
