//! redirect-core: Constant rewriting for compiled artifacts
//!
//! Retargets hard-coded legacy endpoint literals without touching the
//! program's source:
//! - `artifact`: in-memory structure of one compiled unit (methods, instructions, literals)
//! - `mapper`: the `ConstantMapper` seam and the legacy skin URL mapper
//! - `rewrite`: `LdcTransform`, which swaps literal loads in place, and `TransformPipeline`
//!
//! # Rewrite guarantees
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Instruction shape | Unchanged - only `Ldc` string operands are replaced |
//! | Non-string constants | Passed through untouched |
//! | Mapper failure | Whole artifact rejected, never partially patched |
//! | Modified callback | Fires once per actual substitution, only after the whole artifact succeeded |

pub mod artifact;
mod error;
pub mod mapper;
pub mod rewrite;

pub use artifact::{CodeArtifact, Constant, Instruction, Method};
pub use error::{MapperError, TransformError};
pub use mapper::{ConstantMapper, LegacyUrlMapper, StaticRoot, UrlRoot, DEFAULT_LEGACY_ENDPOINTS};
pub use rewrite::{LdcTransform, TransformPipeline, TransformUnit};

pub type Result<T> = std::result::Result<T, TransformError>;
