//! HTTP surface of the shim
//!
//! Everything is routed through a single fallback entry point: requests that
//! look like `/<namespace>/<username>.<ext>` are translated into backend
//! calls, anything else gets the default `404`.

use std::sync::{Arc, OnceLock};

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use regex::Regex;

use crate::backend::{TextureKind, YggdrasilClient};
use crate::config::ShimConfig;
use crate::error::Result;

/// Server state
pub struct AppState {
    pub client: YggdrasilClient,
}

impl AppState {
    pub fn new(config: Arc<ShimConfig>) -> Result<Self> {
        Ok(Self {
            client: YggdrasilClient::new(config)?,
        })
    }
}

/// A request in the shape of the retired texture API.
///
/// The namespace is kept for logging only: every request is answered with
/// the user's skin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRequest {
    pub namespace: String,
    pub username: String,
}

impl LegacyRequest {
    /// Match `/<namespace>/<username>.<ext>` on a raw request path. The
    /// username is percent-decoded; one that isn't valid UTF-8 once decoded
    /// doesn't match.
    pub fn parse(path: &str) -> Option<Self> {
        let captures = legacy_path_pattern().captures(path)?;
        let username = urlencoding::decode(&captures["username"]).ok()?;
        Some(Self {
            namespace: captures["namespace"].to_string(),
            username: username.into_owned(),
        })
    }
}

fn legacy_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/(?P<namespace>[^/]+)/(?P<username>[^/]+)\.(?P<ext>[^/.]+)$")
            .expect("legacy path pattern is valid")
    })
}

/// Create the shim router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new().fallback(serve).with_state(state)
}

async fn serve(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    match LegacyRequest::parse(uri.path()) {
        Some(request) => serve_texture(&state.client, &request).await,
        None => fallback(&uri),
    }
}

fn fallback(uri: &Uri) -> Response {
    tracing::debug!(path = uri.path(), "Unrecognized request");
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Answer one legacy texture request
pub async fn serve_texture(client: &YggdrasilClient, request: &LegacyRequest) -> Response {
    let username = request.username.as_str();
    let namespace = request.namespace.as_str();

    let texture_url = match resolve_texture_url(client, username).await {
        Ok(url) => url,
        Err(e) => {
            tracing::info!(username, namespace, error = %e, "Unable to fetch texture");
            return e.into_response();
        }
    };

    let Some(url) = texture_url else {
        tracing::info!(username, namespace, "No texture found");
        return StatusCode::NOT_FOUND.into_response();
    };

    tracing::debug!(username, url = %url, "Retrieving texture");
    match client.fetch_texture(&url).await {
        Ok(data) => {
            tracing::info!(username, url = %url, bytes = data.len(), "Retrieved texture");
            (StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], data).into_response()
        }
        Err(e) => {
            tracing::info!(url = %url, error = %e, "Unable to retrieve texture");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Steps 1-3: username -> uuid -> profile -> skin URL
async fn resolve_texture_url(client: &YggdrasilClient, username: &str) -> Result<Option<String>> {
    let Some(uuid) = client.search_profile(username).await? else {
        return Ok(None);
    };
    let Some(profile) = client.fetch_profile(&uuid).await? else {
        return Ok(None);
    };
    profile.texture_url(TextureKind::Skin)
}
