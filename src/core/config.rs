// ─── Launch Options ───
// Caller-supplied configuration for one provisioning + launch invocation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

const DEFAULT_META_URL: &str = "https://launchermeta.mojang.com";
const DEFAULT_RESOURCE_URL: &str = "https://resources.download.minecraft.net";
const DEFAULT_MAX_SOCKETS: usize = 2;
const DEFAULT_TIMEOUT_MS: u64 = 50_000;

/// Heap size as either a bare number of megabytes or a JVM size string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryValue {
    Megabytes(u64),
    Text(String),
}

impl MemoryValue {
    /// Numbers gain an `M` suffix, strings pass through (`"4G"`).
    pub fn to_jvm(&self) -> String {
        match self {
            MemoryValue::Megabytes(mb) => format!("{}M", mb),
            MemoryValue::Text(text) => text.trim().to_string(),
        }
    }
}

impl From<&str> for MemoryValue {
    fn from(value: &str) -> Self {
        MemoryValue::Text(value.to_string())
    }
}

impl From<u64> for MemoryValue {
    fn from(value: u64) -> Self {
        MemoryValue::Megabytes(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryOptions {
    pub max: MemoryValue,
    pub min: MemoryValue,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            max: MemoryValue::Text("2G".into()),
            min: MemoryValue::Text("1G".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionOptions {
    /// Exact manifest id, e.g. `1.20.1`.
    pub number: String,
    /// Value for `${version_type}`.
    #[serde(rename = "type", default = "default_version_type")]
    pub version_type: String,
}

fn default_version_type() -> String {
    "release".into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickPlayKind {
    Singleplayer,
    Multiplayer,
    Realms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickPlay {
    #[serde(rename = "type")]
    pub kind: QuickPlayKind,
    pub identifier: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Legacy direct-connect (`--server`/`--port`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOptions {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlOverrides {
    /// Base for the global version manifest.
    pub meta: String,
    /// Base for content-addressed asset objects.
    pub resource: String,
}

impl Default for UrlOverrides {
    fn default() -> Self {
        Self {
            meta: DEFAULT_META_URL.into(),
            resource: DEFAULT_RESOURCE_URL.into(),
        }
    }
}

impl UrlOverrides {
    pub fn manifest_url(&self) -> String {
        format!("{}/mc/game/version_manifest.json", self.meta.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    /// Working directory of the game. Defaults to the root.
    pub game_directory: Option<PathBuf>,
    pub natives_directory: Option<PathBuf>,
    /// Runtime jar location. Defaults to `versions/<id>/<id>.jar`.
    pub client_jar: Option<PathBuf>,
    pub java_path: Option<PathBuf>,
    pub detached: bool,
    /// Upper bound on simultaneous downloads.
    pub max_sockets: usize,
    /// Per-fetch timeout.
    pub timeout_ms: u64,
    pub url: UrlOverrides,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            game_directory: None,
            natives_directory: None,
            client_jar: None,
            java_path: None,
            detached: false,
            max_sockets: DEFAULT_MAX_SOCKETS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            url: UrlOverrides::default(),
        }
    }
}

/// Full configuration of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Minecraft directory. Defaults to [`LaunchOptions::default_root`].
    #[serde(default = "LaunchOptions::default_root")]
    pub root: PathBuf,
    pub version: VersionOptions,
    #[serde(default)]
    pub memory: MemoryOptions,
    #[serde(default)]
    pub window: Option<WindowOptions>,
    #[serde(default)]
    pub overrides: Overrides,
    /// Extra JVM flags appended verbatim.
    #[serde(default)]
    pub custom_args: Vec<String>,
    /// Extra game arguments appended last.
    #[serde(default)]
    pub custom_launch_args: Vec<String>,
    #[serde(default)]
    pub quick_play: Option<QuickPlay>,
    #[serde(default)]
    pub server: Option<ServerOptions>,
    #[serde(default)]
    pub demo: bool,
}

impl LaunchOptions {
    pub fn new(root: impl Into<PathBuf>, version: &str) -> Self {
        Self {
            root: root.into(),
            version: VersionOptions {
                number: version.to_string(),
                version_type: default_version_type(),
            },
            memory: MemoryOptions::default(),
            window: None,
            overrides: Overrides::default(),
            custom_args: Vec::new(),
            custom_launch_args: Vec::new(),
            quick_play: None,
            server: None,
            demo: false,
        }
    }

    /// Read options from a JSON file.
    pub fn from_json_file(path: &Path) -> LauncherResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// `<data dir>/.minecraft`, or `./.minecraft` when the platform has none.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    }

    pub fn with_memory(mut self, max: impl Into<MemoryValue>, min: impl Into<MemoryValue>) -> Self {
        self.memory = MemoryOptions {
            max: max.into(),
            min: min.into(),
        };
        self
    }

    pub fn with_window(mut self, window: WindowOptions) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_custom_args(mut self, args: Vec<String>) -> Self {
        self.custom_args = args;
        self
    }

    pub fn with_java_path(mut self, java: impl Into<PathBuf>) -> Self {
        self.overrides.java_path = Some(java.into());
        self
    }

    pub fn with_max_sockets(mut self, n: usize) -> Self {
        self.overrides.max_sockets = n;
        self
    }

    // ── Derived paths ───────────────────────────────────

    pub fn game_dir(&self) -> PathBuf {
        self.overrides
            .game_directory
            .clone()
            .unwrap_or_else(|| self.root.clone())
    }

    pub fn version_dir(&self) -> PathBuf {
        self.root.join("versions").join(&self.version.number)
    }

    pub fn version_json_path(&self) -> PathBuf {
        self.version_dir().join(format!("{}.json", self.version.number))
    }

    pub fn client_jar_path(&self) -> PathBuf {
        self.overrides
            .client_jar
            .clone()
            .unwrap_or_else(|| self.version_dir().join(format!("{}.jar", self.version.number)))
    }

    pub fn manifest_cache_path(&self) -> PathBuf {
        self.root
            .join("cache")
            .join("json")
            .join("version_manifest.json")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.overrides
            .natives_directory
            .clone()
            .unwrap_or_else(|| self.root.join("natives").join(&self.version.number))
    }

    pub fn java_path(&self) -> PathBuf {
        self.overrides
            .java_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("java"))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.overrides.timeout_ms)
    }

    pub fn max_sockets(&self) -> usize {
        self.overrides.max_sockets.max(1)
    }
}
