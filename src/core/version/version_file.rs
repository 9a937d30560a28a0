// ─── Version File ───
// Parses a Mojang version JSON: runtime jar, libraries, assets and arguments.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};

use super::rules::{argument_included, library_included, FeatureSet, Platform, Rule};

/// A fully parsed Mojang version JSON (the Version Descriptor).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    /// Asset index id on descriptors that predate `assetIndex`.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// One item of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional(ConditionalArgument),
    /// Anything else (numbers, objects without rules) is kept as-is and
    /// filtered at the end of argument building.
    Other(Value),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConditionalArgument {
    pub rules: Vec<Rule>,
    /// A single token or a list of tokens to splice in.
    pub value: Value,
}

impl Argument {
    /// Expand into zero or more raw tokens for the given target.
    pub fn expand(&self, platform: &Platform, features: &FeatureSet) -> Vec<Value> {
        match self {
            Argument::Plain(token) => vec![Value::String(token.clone())],
            Argument::Conditional(cond) => {
                if !argument_included(&cond.rules, platform, features) {
                    return vec![];
                }
                match &cond.value {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                }
            }
            Argument::Other(value) => vec![value.clone()],
        }
    }
}

// ─── Library Entry ───

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// OS name → classifier template, e.g. `"windows": "natives-windows-${arch}"`.
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    /// Maven repository base for name-only entries.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LibDownloadArtifact {
    pub path: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

impl Library {
    pub fn is_allowed(&self, platform: &Platform) -> bool {
        library_included(&self.rules, platform)
    }

    /// Classpath artifact, either declared or derived from the Maven name.
    ///
    /// Natives-only entries (no artifact, but classifiers) yield `None`.
    pub fn classpath_artifact(&self) -> Option<LibDownloadArtifact> {
        if let Some(downloads) = &self.downloads {
            if let Some(artifact) = &downloads.artifact {
                return Some(artifact.clone());
            }
            if downloads.classifiers.is_some() {
                return None;
            }
        }

        let coord = MavenArtifact::parse(&self.name)?;
        let base = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        Some(LibDownloadArtifact {
            path: coord.relative_path(),
            sha1: None,
            size: None,
            url: coord.url(base),
        })
    }

    /// Native archive for the target OS, if this library ships one.
    ///
    /// Honors the `natives` template map first, then the conventional
    /// `natives-<os>` key. macOS natives appear as either `natives-osx` or
    /// `natives-macos`.
    pub fn native_classifier(&self, platform: &Platform) -> Option<&LibDownloadArtifact> {
        let classifiers = self.downloads.as_ref()?.classifiers.as_ref()?;

        if let Some(template) = self
            .natives
            .as_ref()
            .and_then(|n| n.get(platform.os.mojang_name()))
        {
            let key = template.replace("${arch}", platform.arch.bits());
            if let Some(found) = classifiers.get(&key) {
                return Some(found);
            }
        }

        match platform.os {
            super::rules::OsFamily::Osx => classifiers
                .get("natives-osx")
                .or_else(|| classifiers.get("natives-macos")),
            os => classifiers.get(&format!("natives-{}", os.mojang_name())),
        }
    }
}

/// Numeric shape of a release id: `1.<minor>[.<patch>]`.
///
/// Snapshots (`23w31a`) and other non-release ids do not parse, which makes
/// every version-gated behavior skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseVersion {
    pub minor: u32,
    pub patch: Option<u32>,
}

impl ReleaseVersion {
    pub fn parse(id: &str) -> Option<Self> {
        let mut parts = id.split('.');
        parts.next()?;
        let minor = leading_number(parts.next()?)?;
        let patch = parts.next().and_then(leading_number);
        Some(Self { minor, patch })
    }
}

fn leading_number(segment: &str) -> Option<u32> {
    let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl VersionJson {
    /// Fetch and parse a version JSON. Returns the raw text for caching.
    pub async fn fetch(fetcher: &dyn Fetcher, url: &str) -> LauncherResult<(Self, String)> {
        let bytes = fetcher.fetch(url).await?;
        let raw = String::from_utf8_lossy(&bytes).into_owned();
        let version_json: VersionJson = serde_json::from_str(&raw)?;
        Ok((version_json, raw))
    }

    pub async fn load_from(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Save the raw version JSON, creating the version directory.
    pub async fn save_to(raw_json: &str, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(path, raw_json)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Ok(())
    }

    pub fn release(&self) -> Option<ReleaseVersion> {
        ReleaseVersion::parse(&self.id)
    }

    pub fn main_class(&self) -> LauncherResult<&str> {
        self.main_class
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LauncherError::LaunchConfig(format!("{} declares no mainClass", self.id)))
    }

    pub fn client_download(&self) -> LauncherResult<&DownloadArtifact> {
        self.downloads
            .as_ref()
            .and_then(|d| d.client.as_ref())
            .ok_or_else(|| {
                LauncherError::LaunchConfig(format!("{} declares no client download", self.id))
            })
    }

    pub fn asset_index_info(&self) -> LauncherResult<&AssetIndexInfo> {
        self.asset_index.as_ref().ok_or_else(|| {
            LauncherError::LaunchConfig(format!("{} declares no assetIndex", self.id))
        })
    }

    /// Asset index id, falling back to the legacy `assets` field.
    pub fn asset_index_id(&self) -> Option<&str> {
        self.asset_index
            .as_ref()
            .map(|a| a.id.as_str())
            .or(self.assets.as_deref())
    }

    /// Libraries that pass the rule filter for `platform`, in manifest order.
    pub fn allowed_libraries<'a>(
        &'a self,
        platform: &'a Platform,
    ) -> impl Iterator<Item = &'a Library> + 'a {
        self.libraries.iter().filter(move |lib| lib.is_allowed(platform))
    }

    /// Raw game argument tokens after conditional expansion.
    pub fn game_tokens(&self, platform: &Platform, features: &FeatureSet) -> Vec<Value> {
        match &self.arguments {
            Some(args) if !args.game.is_empty() => args
                .game
                .iter()
                .flat_map(|arg| arg.expand(platform, features))
                .collect(),
            _ => self
                .minecraft_arguments
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(|s| Value::String(s.to_string()))
                .collect(),
        }
    }

    /// Raw JVM argument tokens after conditional expansion.
    pub fn jvm_tokens(&self, platform: &Platform, features: &FeatureSet) -> Vec<Value> {
        match &self.arguments {
            Some(args) => args
                .jvm
                .iter()
                .flat_map(|arg| arg.expand(platform, features))
                .collect(),
            None => vec![],
        }
    }
}
