use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::core::config::LaunchOptions;
use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::version::AssetIndexInfo;

/// Manages Minecraft asset downloads (sounds, textures referenced by asset index).
pub struct AssetManager;

/// Top-level asset index JSON structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
    /// Pre-1.7 layout: objects are also copied under `assets/virtual/legacy`.
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    /// Pre-1.6 layout: objects are also copied under `<game dir>/resources`.
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// `<hh>/<hash>`, or `None` for a malformed hash.
    pub fn object_path(&self) -> Option<String> {
        let prefix = self.hash.get(..2)?;
        Some(format!("{}/{}", prefix, self.hash))
    }
}

impl AssetIndex {
    /// Whether objects need the name-addressed legacy copy.
    pub fn needs_virtual_copy(&self, index_id: &str) -> bool {
        self.is_virtual || matches!(index_id, "legacy" | "pre-1.6")
    }
}

/// Where the asset placeholders point for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    /// Value of `${assets_root}`.
    pub assets_root: PathBuf,
    /// Value of `${game_assets}`.
    pub game_assets: PathBuf,
}

impl AssetLayout {
    pub fn for_index(index: &AssetIndex, options: &LaunchOptions) -> Self {
        let assets_root = if index.map_to_resources {
            options.game_dir().join("resources")
        } else {
            options.assets_dir()
        };
        Self {
            assets_root,
            game_assets: virtual_dir(options),
        }
    }
}

fn virtual_dir(options: &LaunchOptions) -> PathBuf {
    options.assets_dir().join("virtual").join("legacy")
}

impl AssetManager {
    /// Materialize the asset index and every object it references.
    ///
    /// The index is cached at `assets/indexes/<id>.json`. Objects are
    /// content-addressed under `assets/objects/<hh>/<hash>` and never
    /// re-downloaded once present. Names sharing a hash share one download.
    pub async fn download_assets(
        info: &AssetIndexInfo,
        options: &LaunchOptions,
        downloader: &Downloader,
        sink: &dyn EventSink,
    ) -> LauncherResult<AssetIndex> {
        let assets_dir = options.assets_dir();

        // 1. Asset index JSON
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", info.id));
        downloader.download_file(&info.url, &index_path).await?;
        let index_text = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|e| LauncherError::io(&index_path, e))?;
        let index: AssetIndex = serde_json::from_str(&index_text)?;

        // 2. Objects, checked at their hash-derived path
        let objects_dir = assets_dir.join("objects");
        let resource_base = options.overrides.url.resource.trim_end_matches('/');
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut cached = 0;

        for (name, obj) in &index.objects {
            let Some(rel) = obj.object_path() else {
                warn!("Skipping asset {} with malformed hash {:?}", name, obj.hash);
                continue;
            };
            if !seen.insert(obj.hash.to_ascii_lowercase()) {
                continue;
            }
            let dest = objects_dir.join(&rel);
            if dest.exists() {
                cached += 1;
            }
            entries.push(
                DownloadEntry::new(format!("{}/{}", resource_base, rel), dest)
                    .with_sha1(Some(obj.hash.clone()))
                    .with_size(Some(obj.size)),
            );
        }

        info!(
            "Asset index {}: {} objects ({} already cached)",
            info.id,
            entries.len(),
            cached
        );

        downloader.download_batch("assets", entries, sink).await?;

        // 3. Legacy name-addressed layouts
        if index.map_to_resources {
            let target = options.game_dir().join("resources");
            copy_legacy_objects(&index, &objects_dir, &target, "assets-copy", sink).await?;
        }
        if index.needs_virtual_copy(&info.id) {
            copy_legacy_objects(&index, &objects_dir, &virtual_dir(options), "assets-copy", sink)
                .await?;
        }

        sink.debug(format!("Downloaded assets for index {}", info.id));
        Ok(index)
    }
}

/// Copy each object from its hash path to `<target>/<name>`, skipping copies
/// that already exist.
async fn copy_legacy_objects(
    index: &AssetIndex,
    objects_dir: &Path,
    target: &Path,
    category: &str,
    sink: &dyn EventSink,
) -> LauncherResult<()> {
    let total = index.objects.len();
    sink.progress(category, 0, total);

    for (done, (name, obj)) in index.objects.iter().enumerate() {
        let dest = target.join(name);
        if let Some(rel) = obj.object_path() {
            if !dest.exists() {
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| LauncherError::io(parent, e))?;
                }
                let source = objects_dir.join(rel);
                tokio::fs::copy(&source, &dest)
                    .await
                    .map_err(|e| LauncherError::io(&source, e))?;
            }
        }
        sink.progress(category, done + 1, total);
    }

    info!("Copied {} legacy assets into {:?}", total, target);
    Ok(())
}
