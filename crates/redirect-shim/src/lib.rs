//! redirect-shim: Local compatibility server for the retired skin API
//!
//! Legacy clients ask for `/<namespace>/<username>.png`. The shim answers by
//! resolving the name against a Yggdrasil-shaped backend, decoding the
//! profile's `textures` property, and proxying the image bytes.
//!
//! The listener is started lazily through [`ShimHandle`], the first time a
//! rewritten literal needs its address.

pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod routes;

pub use backend::{BackendProfile, TextureKind, YggdrasilClient};
pub use config::ShimConfig;
pub use error::{ConfigError, FetchError, StartError};
pub use handle::{create_transform_unit, ShimHandle, ShimState, SkinRedirectUnit};
pub use routes::{create_router, AppState};
