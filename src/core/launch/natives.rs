// ─── Native Extractor ───
// Downloads per-OS native archives and unpacks them into the natives directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::config::LaunchOptions;
use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::version::{Platform, VersionJson};

/// From this minor version on, natives ship inside the client runtime.
pub const BUNDLED_NATIVES_MINOR: u32 = 19;

/// Capability: unpack archive `archive` into directory `target`.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    async fn extract(&self, archive: &Path, target: &Path) -> LauncherResult<()>;
}

/// `zip`-backed extractor. Skips `META-INF/` and entries escaping `target`.
pub struct ZipExtractor;

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract(&self, archive: &Path, target: &Path) -> LauncherResult<()> {
        let archive = archive.to_path_buf();
        let target = target.to_path_buf();

        tokio::task::spawn_blocking(move || extract_zip(&archive, &target))
            .await
            .map_err(|e| std::io::Error::other(format!("Task join error: {}", e)))?
    }
}

fn extract_zip(archive_path: &Path, target: &Path) -> LauncherResult<()> {
    let file = std::fs::File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(std::io::BufReader::new(file))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        if relative.starts_with("META-INF") {
            continue;
        }

        let dest = target.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| LauncherError::io(&dest, e))?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&dest).map_err(|e| LauncherError::io(&dest, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&dest, e))?;
        debug!("Extracted native: {:?}", dest);
    }

    Ok(())
}

/// Result of the natives step. Extraction failures are collected, not thrown.
#[derive(Debug)]
pub struct NativesOutcome {
    /// Value for `-Djava.library.path`.
    pub directory: PathBuf,
    /// Step skipped (bundled natives, or directory already populated).
    pub skipped: bool,
    pub extracted: Vec<PathBuf>,
    pub failures: Vec<LauncherError>,
}

impl NativesOutcome {
    fn skipped(directory: PathBuf) -> Self {
        Self {
            directory,
            skipped: true,
            extracted: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Whether this version still needs natives extracted by the launcher.
pub fn needs_native_extraction(version: &VersionJson) -> bool {
    !version
        .release()
        .is_some_and(|r| r.minor >= BUNDLED_NATIVES_MINOR)
}

/// Download and unpack the native archives of `version` for `platform`.
///
/// Skipped entirely when the version bundles its natives (the game directory
/// is returned) or when the natives directory already has content.
pub async fn prepare_natives(
    version: &VersionJson,
    options: &LaunchOptions,
    platform: &Platform,
    downloader: &Downloader,
    extractor: &dyn ArchiveExtractor,
    sink: &dyn EventSink,
) -> LauncherResult<NativesOutcome> {
    if !needs_native_extraction(version) {
        sink.debug(format!("{} bundles its natives, skipping extraction", version.id));
        return Ok(NativesOutcome::skipped(options.game_dir()));
    }

    let natives_dir = options.natives_dir();
    if dir_has_entries(&natives_dir).await {
        sink.debug(format!("Set native path to {:?}", natives_dir));
        return Ok(NativesOutcome::skipped(natives_dir));
    }

    tokio::fs::create_dir_all(&natives_dir)
        .await
        .map_err(|e| LauncherError::io(&natives_dir, e))?;

    let entries: Vec<DownloadEntry> = version
        .allowed_libraries(platform)
        .filter_map(|lib| lib.native_classifier(platform))
        .filter_map(|native| {
            let name = native.path.rsplit('/').next()?.to_string();
            Some(
                DownloadEntry::new(&native.url, natives_dir.join(name))
                    .with_sha1(native.sha1.clone())
                    .with_size(native.size),
            )
        })
        .collect();

    downloader
        .download_batch("natives", entries.clone(), sink)
        .await?;

    let mut outcome = NativesOutcome {
        directory: natives_dir.clone(),
        skipped: false,
        extracted: Vec::new(),
        failures: Vec::new(),
    };

    for entry in &entries {
        let verified = match &entry.sha1 {
            Some(expected) => refetch_on_mismatch(entry, expected, downloader).await,
            None => Ok(()),
        };

        match verified {
            Err(err @ LauncherError::ChecksumMismatch { .. }) => {
                warn!("Not extracting {:?}: {}", entry.dest, err);
                outcome.failures.push(err);
            }
            Err(err) => return Err(err),
            Ok(()) => match extractor.extract(&entry.dest, &natives_dir).await {
                Ok(()) => outcome.extracted.push(entry.dest.clone()),
                Err(err) => {
                    warn!("Cannot extract native archive {:?}: {}", entry.dest, err);
                    outcome.failures.push(LauncherError::NativeExtraction {
                        archive: entry.dest.clone(),
                        reason: err.to_string(),
                    });
                }
            },
        }

        if let Err(err) = tokio::fs::remove_file(&entry.dest).await {
            warn!("Cannot remove native archive {:?}: {}", entry.dest, err);
        }
    }

    info!(
        "Natives ready in {:?} ({} extracted, {} failed)",
        natives_dir,
        outcome.extracted.len(),
        outcome.failures.len()
    );
    sink.debug("Downloaded and extracted natives".into());
    Ok(outcome)
}

/// A native archive whose checksum is off is fetched once more. A second
/// mismatch is reported as [`LauncherError::ChecksumMismatch`].
async fn refetch_on_mismatch(
    entry: &DownloadEntry,
    expected: &str,
    downloader: &Downloader,
) -> LauncherResult<()> {
    if Downloader::verify_sha1(&entry.dest, expected).await? {
        return Ok(());
    }

    warn!("Checksum mismatch for {:?}, downloading again", entry.dest);
    tokio::fs::remove_file(&entry.dest)
        .await
        .map_err(|e| LauncherError::io(&entry.dest, e))?;
    downloader.download_entry(entry).await?;
    Downloader::require_sha1(&entry.dest, expected).await
}

async fn dir_has_entries(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::RecordingSink;
    use crate::core::testing::FakeFetcher;
    use crate::core::version::{Arch, OsFamily};
    use std::io::Write;
    use std::sync::Arc;

    const LINUX: Platform = Platform {
        os: OsFamily::Linux,
        arch: Arch::X86_64,
    };

    fn native_zip() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("liblwjgl.so", opts).unwrap();
            zip.write_all(b"elf").unwrap();
            zip.start_file("META-INF/MANIFEST.MF", opts).unwrap();
            zip.write_all(b"Manifest-Version: 1.0").unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn version(id: &str) -> VersionJson {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "libraries": [
                {
                    "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                    "downloads": {
                        "classifiers": {
                            "natives-linux": {
                                "path": "org/lwjgl/lwjgl-platform-2.9.4-natives-linux.jar",
                                "url": "https://libraries.test/natives-linux.jar"
                            },
                            "natives-windows": {
                                "path": "org/lwjgl/lwjgl-platform-2.9.4-natives-windows.jar",
                                "url": "https://libraries.test/natives-windows.jar"
                            }
                        }
                    }
                },
                {
                    "name": "broken:natives:1.0",
                    "downloads": {
                        "classifiers": {
                            "natives-linux": {
                                "path": "broken/natives-1.0-natives-linux.jar",
                                "url": "https://libraries.test/broken.jar"
                            }
                        }
                    }
                }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn extracts_natives_and_collects_failures() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.8.9");
        let fetcher = Arc::new(
            FakeFetcher::new()
                .serve("https://libraries.test/natives-linux.jar", native_zip())
                .serve("https://libraries.test/broken.jar", b"not a zip".to_vec()),
        );
        let downloader = Downloader::new(fetcher.clone());

        let outcome = prepare_natives(
            &version("1.8.9"),
            &options,
            &LINUX,
            &downloader,
            &ZipExtractor,
            &RecordingSink::default(),
        )
        .await
        .unwrap();

        let natives = root.path().join("natives/1.8.9");
        assert_eq!(outcome.directory, natives);
        assert!(!outcome.skipped);
        assert!(natives.join("liblwjgl.so").exists());
        assert!(!natives.join("META-INF").exists());
        assert!(!natives.join("lwjgl-platform-2.9.4-natives-linux.jar").exists());
        assert_eq!(outcome.extracted.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0],
            LauncherError::NativeExtraction { .. }
        ));
        assert_eq!(fetcher.calls_for("https://libraries.test/natives-windows.jar"), 0);

        // Populated directory: whole step is skipped.
        let again = prepare_natives(
            &version("1.8.9"),
            &options,
            &LINUX,
            &downloader,
            &ZipExtractor,
            &RecordingSink::default(),
        )
        .await
        .unwrap();
        assert!(again.skipped);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn persistent_checksum_mismatch_is_a_failure_not_an_extraction() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.8.9");
        let url = "https://libraries.test/natives-linux.jar";
        let version: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "1.8.9",
            "libraries": [{
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                "downloads": {"classifiers": {"natives-linux": {
                    "path": "org/lwjgl/lwjgl-platform-2.9.4-natives-linux.jar",
                    "sha1": "0000000000000000000000000000000000000000",
                    "url": url
                }}}
            }]
        }))
        .unwrap();
        let fetcher = Arc::new(FakeFetcher::new().serve(url, native_zip()));
        let downloader = Downloader::new(fetcher.clone());

        let outcome = prepare_natives(
            &version,
            &options,
            &LINUX,
            &downloader,
            &ZipExtractor,
            &RecordingSink::default(),
        )
        .await
        .unwrap();

        let natives = root.path().join("natives/1.8.9");
        assert_eq!(fetcher.calls_for(url), 2);
        assert!(outcome.extracted.is_empty());
        assert!(matches!(
            outcome.failures.as_slice(),
            [LauncherError::ChecksumMismatch { .. }]
        ));
        assert!(!natives.join("liblwjgl.so").exists());
        assert!(!natives.join("lwjgl-platform-2.9.4-natives-linux.jar").exists());
    }

    #[tokio::test]
    async fn bundled_versions_skip_and_return_game_dir() {
        let root = tempfile::tempdir().unwrap();
        let options = LaunchOptions::new(root.path(), "1.19.4");
        let fetcher = Arc::new(FakeFetcher::new());
        let downloader = Downloader::new(fetcher.clone());

        let outcome = prepare_natives(
            &version("1.19.4"),
            &options,
            &LINUX,
            &downloader,
            &ZipExtractor,
            &RecordingSink::default(),
        )
        .await
        .unwrap();

        assert!(outcome.skipped);
        assert_eq!(outcome.directory, options.game_dir());
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn snapshots_still_extract() {
        assert!(needs_native_extraction(&version("1.12.2")));
        assert!(needs_native_extraction(&version("21w19a")));
        assert!(!needs_native_extraction(&version("1.20.1")));
    }
}
