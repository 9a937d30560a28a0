// ─── Version Manifest ───
// Handles fetching and parsing the global Mojang version manifest.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;

/// Top-level Mojang version manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: Option<DateTime<Utc>>,
    pub url: String,
}

impl VersionManifest {
    /// Fetch the manifest. Returns the raw text so it can be cached verbatim.
    pub async fn fetch(fetcher: &dyn Fetcher, url: &str) -> LauncherResult<(Self, String)> {
        info!("Fetching Minecraft version manifest...");

        let bytes = fetcher.fetch(url).await?;
        let raw = String::from_utf8_lossy(&bytes).into_owned();
        let manifest: VersionManifest = serde_json::from_str(&raw)?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok((manifest, raw))
    }

    /// Load a manifest previously written by [`VersionManifest::save_cache`].
    pub async fn load_cached(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save_cache(raw: &str, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }

    /// Find a specific version entry by exact id (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}
