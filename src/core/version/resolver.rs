// ─── Version Resolver ───
// Cached descriptor → fresh manifest → cached manifest (offline) → descriptor.

use tracing::{info, warn};

use crate::core::config::LaunchOptions;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::http::Fetcher;

use super::manifest::VersionManifest;
use super::version_file::VersionJson;

pub struct VersionResolver<'a> {
    fetcher: &'a dyn Fetcher,
    options: &'a LaunchOptions,
}

impl<'a> VersionResolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, options: &'a LaunchOptions) -> Self {
        Self { fetcher, options }
    }

    /// Produce the descriptor for the configured version.
    ///
    /// A descriptor already cached under `versions/<id>/<id>.json` is
    /// returned without touching the network.
    pub async fn resolve(&self, sink: &dyn EventSink) -> LauncherResult<VersionJson> {
        let version_id = self.options.version.number.as_str();
        let cached = self.options.version_json_path();

        if cached.exists() {
            sink.debug(format!("Using cached version descriptor {:?}", cached));
            return VersionJson::load_from(&cached).await;
        }

        let manifest_url = self.options.overrides.url.manifest_url();
        let (manifest, fresh_raw) =
            match VersionManifest::fetch(self.fetcher, &manifest_url).await {
                Ok((manifest, raw)) => (manifest, Some(raw)),
                Err(err) => {
                    warn!("Version manifest unreachable, trying offline cache: {}", err);
                    sink.debug(format!(
                        "Failed to fetch version manifest ({err}), falling back to cache"
                    ));
                    (self.load_offline_manifest(&err).await?, None)
                }
            };
        let offline = fresh_raw.is_none();

        let entry = match manifest.find_version(version_id) {
            Some(entry) => entry,
            None if offline => {
                return Err(LauncherError::Resolution(format!(
                    "{} is not listed in the cached manifest",
                    version_id
                )))
            }
            None => return Err(LauncherError::VersionNotFound(version_id.to_string())),
        };

        let (descriptor, raw) = VersionJson::fetch(self.fetcher, &entry.url)
            .await
            .map_err(|err| {
                if offline {
                    LauncherError::Resolution(format!(
                        "descriptor for {} unavailable offline: {}",
                        version_id, err
                    ))
                } else {
                    err
                }
            })?;

        VersionJson::save_to(&raw, &cached).await?;
        if let Some(raw_manifest) = fresh_raw {
            VersionManifest::save_cache(&raw_manifest, &self.options.manifest_cache_path())
                .await?;
        }

        info!("Resolved version {} ({})", descriptor.id, entry.version_type);
        sink.debug(format!("Resolved version descriptor for {}", descriptor.id));
        Ok(descriptor)
    }

    async fn load_offline_manifest(&self, cause: &LauncherError) -> LauncherResult<VersionManifest> {
        let path = self.options.manifest_cache_path();
        if !path.exists() {
            return Err(LauncherError::Resolution(format!(
                "{} and no cached manifest at {:?}",
                cause, path
            )));
        }

        VersionManifest::load_cached(&path)
            .await
            .map_err(|err| LauncherError::Resolution(format!("cached manifest unusable: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::NullSink;
    use crate::core::testing::FakeFetcher;

    const MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";
    const DESCRIPTOR_URL: &str = "https://piston-meta.test/1.20.1.json";

    fn manifest_body() -> String {
        serde_json::json!({
            "latest": {"release": "1.20.1", "snapshot": "1.20.1"},
            "versions": [{"id": "1.20.1", "type": "release", "url": DESCRIPTOR_URL}]
        })
        .to_string()
    }

    fn descriptor_body() -> String {
        serde_json::json!({
            "id": "1.20.1",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main"
        })
        .to_string()
    }

    #[tokio::test]
    async fn fresh_resolution_caches_descriptor_and_manifest() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.20.1");
        let fetcher = FakeFetcher::new()
            .serve(MANIFEST_URL, manifest_body())
            .serve(DESCRIPTOR_URL, descriptor_body());

        let version = VersionResolver::new(&fetcher, &options)
            .resolve(&NullSink)
            .await
            .unwrap();

        assert_eq!(version.id, "1.20.1");
        assert!(options.version_json_path().exists());
        assert!(options.manifest_cache_path().exists());
    }

    #[tokio::test]
    async fn cached_descriptor_needs_no_network() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.20.1");
        VersionJson::save_to(&descriptor_body(), &options.version_json_path())
            .await
            .unwrap();
        let fetcher = FakeFetcher::new();

        let version = VersionResolver::new(&fetcher, &options)
            .resolve(&NullSink)
            .await
            .unwrap();
        assert_eq!(version.id, "1.20.1");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_version_is_version_not_found() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "0.0.1");
        let fetcher = FakeFetcher::new().serve(MANIFEST_URL, manifest_body());

        let err = VersionResolver::new(&fetcher, &options)
            .resolve(&NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::VersionNotFound(id) if id == "0.0.1"));
    }

    #[tokio::test]
    async fn offline_without_cache_is_resolution_error() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.20.1");
        let fetcher = FakeFetcher::new();

        let err = VersionResolver::new(&fetcher, &options)
            .resolve(&NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Resolution(_)));
    }

    #[tokio::test]
    async fn offline_manifest_is_used_when_fetch_fails() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.20.1");
        VersionManifest::save_cache(&manifest_body(), &options.manifest_cache_path())
            .await
            .unwrap();
        // Manifest endpoint down, descriptor still reachable.
        let fetcher = FakeFetcher::new().serve(DESCRIPTOR_URL, descriptor_body());

        let version = VersionResolver::new(&fetcher, &options)
            .resolve(&NullSink)
            .await
            .unwrap();
        assert_eq!(version.id, "1.20.1");
        assert_eq!(fetcher.calls_for(MANIFEST_URL), 1);
    }

    #[tokio::test]
    async fn offline_manifest_missing_version_is_resolution_error() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.12.2");
        VersionManifest::save_cache(&manifest_body(), &options.manifest_cache_path())
            .await
            .unwrap();
        let fetcher = FakeFetcher::new();

        let err = VersionResolver::new(&fetcher, &options)
            .resolve(&NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Resolution(_)));
    }
}
