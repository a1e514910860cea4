//! Yggdrasil backend client
//!
//! Three calls back the legacy skin lookup:
//! 1. `POST api/profiles/minecraft` with `["<username>"]` to resolve the profile id
//! 2. `GET sessionserver/session/minecraft/profile/<uuid>` for its properties
//! 3. `GET <texture url>` for the image itself

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::config::ShimConfig;
use crate::error::{FetchError, Result};

/// Name of the profile property carrying the texture payload
pub const TEXTURES_PROPERTY: &str = "textures";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Skin,
    Cape,
}

impl TextureKind {
    /// Key of this texture in the decoded payload
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureKind::Skin => "SKIN",
            TextureKind::Cape => "CAPE",
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the profile search response
#[derive(Debug, Deserialize)]
struct ProfileRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Property {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    properties: Vec<Property>,
}

/// Entries stay raw so a malformed texture doesn't spoil lookups of another kind
#[derive(Debug, Deserialize)]
struct TexturesPayload {
    textures: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TextureEntry {
    url: String,
}

/// Profile fetched for the duration of one shim request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub uuid: String,
    /// Property name -> base64 value
    pub properties: HashMap<String, String>,
}

impl BackendProfile {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// URL of the requested texture.
    ///
    /// `Ok(None)` when the profile has no textures property or the payload has
    /// no entry for `kind`. A payload that doesn't decode, or a malformed entry
    /// for `kind` itself, is an error; other entries are never inspected.
    pub fn texture_url(&self, kind: TextureKind) -> Result<Option<String>> {
        let Some(encoded) = self.property(TEXTURES_PROPERTY) else {
            return Ok(None);
        };
        let decoded = general_purpose::STANDARD.decode(encoded)?;
        let mut payload: TexturesPayload = serde_json::from_slice(&decoded)?;
        let Some(raw) = payload.textures.remove(kind.as_str()) else {
            return Ok(None);
        };
        let entry: TextureEntry = serde_json::from_value(raw)?;
        Ok(Some(entry.url))
    }
}

/// Client for a Yggdrasil-shaped authentication backend
#[derive(Clone)]
pub struct YggdrasilClient {
    http: Client,
    config: Arc<ShimConfig>,
}

impl YggdrasilClient {
    pub fn new(config: Arc<ShimConfig>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Resolve a username to its profile id.
    ///
    /// No match is `Ok(None)`. More than one exact match breaks the backend
    /// contract and is reported as an error.
    pub async fn search_profile(&self, username: &str) -> Result<Option<String>> {
        let url = self.config.profile_search_url();
        let resp = self.http.post(&url).json(&[username]).send().await?;
        let text = check_status(resp, &url).await?.text().await?;
        tracing::debug!(username, response = %text, "Queried profile id");

        let mut profiles: Vec<ProfileRef> = serde_json::from_str(&text)?;
        match profiles.len() {
            0 => Ok(None),
            1 => Ok(profiles.pop().map(|p| p.id)),
            count => Err(FetchError::UnexpectedProfileCount {
                username: username.to_string(),
                count,
            }),
        }
    }

    /// Fetch a profile's properties. An empty body means the profile doesn't exist.
    pub async fn fetch_profile(&self, uuid: &str) -> Result<Option<BackendProfile>> {
        let url = self.config.session_profile_url(uuid);
        let resp = self.http.get(&url).send().await?;
        let text = check_status(resp, &url).await?.text().await?;

        if text.trim().is_empty() {
            tracing::debug!(uuid, "Profile not found");
            return Ok(None);
        }
        tracing::debug!(uuid, response = %text, "Queried profile");

        let response: ProfileResponse = serde_json::from_str(&text)?;
        let mut properties = HashMap::with_capacity(response.properties.len());
        for property in response.properties {
            // First occurrence wins
            properties.entry(property.name).or_insert(property.value);
        }

        Ok(Some(BackendProfile {
            uuid: uuid.to_string(),
            properties,
        }))
    }

    /// Download texture bytes from an arbitrary URL
    pub async fn fetch_texture(&self, url: &str) -> Result<Bytes> {
        let resp = self.http.get(url).send().await?;
        Ok(check_status(resp, url).await?.bytes().await?)
    }
}

async fn check_status(resp: Response, url: &str) -> Result<Response> {
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            status: resp.status().as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp)
}
