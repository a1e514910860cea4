//! Constant mappers: decide which literals get retargeted, and to what

use std::sync::Arc;

use regex::Regex;

use crate::error::MapperError;

/// Retired skin endpoints that compiled clients still reference, as
/// `host[/path-prefix]`. A bare host matches every path on it; a prefix only
/// matches itself and paths below it, so other content on a shared host
/// (resources, downloads) is left alone.
pub const DEFAULT_LEGACY_ENDPOINTS: &[&str] =
    &["skins.minecraft.net", "s3.amazonaws.com/MinecraftSkins"];

/// Maps an observed string literal to an optional replacement.
///
/// `Ok(None)` means "leave the literal alone". Implementations must be callable
/// repeatedly and from many threads at once.
pub trait ConstantMapper: Send + Sync {
    fn map(&self, constant: &str) -> Result<Option<String>, MapperError>;
}

impl<F> ConstantMapper for F
where
    F: Fn(&str) -> Result<Option<String>, MapperError> + Send + Sync,
{
    fn map(&self, constant: &str) -> Result<Option<String>, MapperError> {
        self(constant)
    }
}

/// Source of the base URL that legacy literals are redirected to.
///
/// Evaluated only when a literal actually matches, so implementations may
/// perform lazy setup (such as starting a local listener) on first call.
pub trait UrlRoot: Send + Sync {
    fn base_url(&self) -> Result<String, MapperError>;
}

impl<R: UrlRoot + ?Sized> UrlRoot for Arc<R> {
    fn base_url(&self) -> Result<String, MapperError> {
        (**self).base_url()
    }
}

/// Fixed redirect target
#[derive(Debug, Clone)]
pub struct StaticRoot(pub String);

impl UrlRoot for StaticRoot {
    fn base_url(&self) -> Result<String, MapperError> {
        Ok(self.0.trim_end_matches('/').to_string())
    }
}

/// Rewrites `http(s)://<legacy endpoint>[/rest]` to `<root><endpoint path>[/rest]`
pub struct LegacyUrlMapper<R> {
    pattern: Regex,
    root: R,
}

impl<R: UrlRoot> LegacyUrlMapper<R> {
    /// Mapper over the default legacy skin endpoints
    pub fn new(root: R) -> Self {
        Self::with_endpoints(root, DEFAULT_LEGACY_ENDPOINTS)
    }

    /// Mapper over custom `host[/path-prefix]` endpoints
    pub fn with_endpoints<S: AsRef<str>>(root: R, endpoints: &[S]) -> Self {
        let alternation = endpoints
            .iter()
            .map(|e| regex::escape(e.as_ref().trim_end_matches('/')))
            .collect::<Vec<_>>()
            .join("|");
        let pattern =
            Regex::new(&format!(r"^https?://(?P<endpoint>{alternation})(?P<rest>/.*)?$"))
                .expect("escaped endpoint alternation is a valid pattern");
        Self { pattern, root }
    }

    pub fn root(&self) -> &R {
        &self.root
    }

    pub fn matches(&self, constant: &str) -> bool {
        self.pattern.is_match(constant)
    }
}

impl<R: UrlRoot> ConstantMapper for LegacyUrlMapper<R> {
    fn map(&self, constant: &str) -> Result<Option<String>, MapperError> {
        let Some(captures) = self.pattern.captures(constant) else {
            return Ok(None);
        };
        // Path part of the endpoint itself (empty for host-only endpoints)
        let endpoint = &captures["endpoint"];
        let prefix = endpoint.find('/').map_or("", |i| &endpoint[i..]);
        let rest = captures.name("rest").map_or("", |m| m.as_str());

        let base = self.root.base_url()?;
        Ok(Some(format!("{base}{prefix}{rest}")))
    }
}
