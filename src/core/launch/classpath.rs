// ─── Classpath Builder ───
// Downloads the classpath libraries and joins them with the runtime jar.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::LauncherResult;
use crate::core::events::EventSink;
use crate::core::version::{OsFamily, Platform, VersionJson};

/// Library files for `platform`, in manifest order, paired with their
/// download. Native-only entries never reach the classpath.
pub fn library_entries(
    version: &VersionJson,
    libs_dir: &Path,
    platform: &Platform,
) -> Vec<DownloadEntry> {
    let mut entries: Vec<DownloadEntry> = Vec::new();

    for lib in &version.libraries {
        if !lib.is_allowed(platform) {
            debug!("Skipping library (OS rule): {}", lib.name);
            continue;
        }
        let Some(artifact) = lib.classpath_artifact() else {
            continue;
        };
        let dest = libs_dir.join(&artifact.path);
        if entries.iter().any(|e| e.dest == dest) {
            continue;
        }
        entries.push(
            DownloadEntry::new(artifact.url, dest)
                .with_sha1(artifact.sha1)
                .with_size(artifact.size),
        );
    }

    entries
}

/// Download every classpath library and return their paths in order.
pub async fn download_libraries(
    version: &VersionJson,
    libs_dir: &Path,
    platform: &Platform,
    downloader: &Downloader,
    sink: &dyn EventSink,
) -> LauncherResult<Vec<PathBuf>> {
    let entries = library_entries(version, libs_dir, platform);
    let paths = entries.iter().map(|e| e.dest.clone()).collect();

    downloader.download_batch("classes", entries, sink).await?;
    sink.debug(format!("Collected class paths for {}", version.id));
    Ok(paths)
}

/// Join library paths and the runtime jar into one `-cp` value.
///
/// Uses `;` on Windows, `:` elsewhere. The jar always comes last.
pub fn build_classpath(libraries: &[PathBuf], client_jar: &Path, os: OsFamily) -> String {
    let jar = safe_path_str(client_jar);
    let mut parts: Vec<String> = libraries
        .iter()
        .map(|p| safe_path_str(p))
        .filter(|p| *p != jar)
        .collect();
    dedup_preserving_order(&mut parts);
    parts.push(jar);
    parts.join(os.path_separator())
}

fn dedup_preserving_order(entries: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|entry| seen.insert(entry.clone()));
}

/// Render a path for the JVM command line.
pub fn safe_path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java classpath handling can fail for Windows extended-length paths
        // (e.g. `\\?\C:\...`). Strip the prefix before building arguments.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::Arch;

    fn version() -> VersionJson {
        serde_json::from_value(serde_json::json!({
            "id": "1.12.2",
            "libraries": [
                {
                    "name": "com.mojang:patchy:1.1",
                    "downloads": {"artifact": {
                        "path": "com/mojang/patchy/1.1/patchy-1.1.jar",
                        "url": "https://libraries.minecraft.net/com/mojang/patchy/1.1/patchy-1.1.jar",
                        "sha1": "aafe"
                    }}
                },
                {
                    "name": "ca.weblite:java-objc-bridge:1.0.0",
                    "rules": [{"action": "allow", "os": {"name": "osx"}}],
                    "downloads": {"artifact": {
                        "path": "ca/weblite/java-objc-bridge/1.0.0/java-objc-bridge-1.0.0.jar",
                        "url": "https://libraries.minecraft.net/objc.jar"
                    }}
                },
                {
                    "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                    "downloads": {"classifiers": {"natives-linux": {
                        "path": "n.jar", "url": "https://x/n.jar"
                    }}}
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn library_entries_follow_rules_and_skip_native_only() {
        let linux = Platform::new(OsFamily::Linux, Arch::X86_64);
        let entries = library_entries(&version(), Path::new("/mc/libraries"), &linux);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].dest,
            PathBuf::from("/mc/libraries/com/mojang/patchy/1.1/patchy-1.1.jar")
        );
        assert_eq!(entries[0].sha1.as_deref(), Some("aafe"));

        let mac = Platform::new(OsFamily::Osx, Arch::X86_64);
        assert_eq!(
            library_entries(&version(), Path::new("/mc/libraries"), &mac).len(),
            2
        );
    }

    #[test]
    fn classpath_separator_depends_on_os() {
        let libs = vec![PathBuf::from("/mc/a.jar"), PathBuf::from("/mc/b.jar")];
        let jar = PathBuf::from("/mc/versions/1.20.1/1.20.1.jar");

        let windows = build_classpath(&libs, &jar, OsFamily::Windows);
        assert_eq!(windows, "/mc/a.jar;/mc/b.jar;/mc/versions/1.20.1/1.20.1.jar");

        let linux = build_classpath(&libs, &jar, OsFamily::Linux);
        assert_eq!(linux, "/mc/a.jar:/mc/b.jar:/mc/versions/1.20.1/1.20.1.jar");
        assert!(linux.ends_with("1.20.1.jar"));
    }

    #[test]
    fn classpath_without_libraries_is_just_the_jar() {
        let jar = PathBuf::from("/mc/client.jar");
        assert_eq!(build_classpath(&[], &jar, OsFamily::Osx), "/mc/client.jar");
    }
}
