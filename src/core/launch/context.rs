use std::path::PathBuf;

use crate::core::assets::AssetLayout;
use crate::core::auth::Identity;
use crate::core::config::LaunchOptions;
use crate::core::error::LauncherError;
use crate::core::version::{Platform, VersionJson};

use super::arguments::{redacted, LaunchArguments};

/// Working state of one invocation, filled stage by stage.
///
/// Owned by a single launch and never shared between concurrent ones.
#[derive(Debug)]
pub struct LaunchContext {
    pub options: LaunchOptions,
    pub identity: Identity,
    pub platform: Platform,
    pub version: VersionJson,
    pub client_jar: PathBuf,
    pub libraries: Vec<PathBuf>,
    pub natives_dir: PathBuf,
    /// Per-archive extraction errors, already logged.
    pub native_failures: Vec<LauncherError>,
    pub assets: AssetLayout,
    pub arguments: LaunchArguments,
}

impl LaunchContext {
    /// Everything after the java executable.
    pub fn command_line(&self) -> Vec<String> {
        self.arguments.command_line()
    }

    /// Command line with the access token masked, for logs.
    pub fn command_line_for_logs(&self) -> String {
        redacted(&self.command_line(), &self.identity).join(" ")
    }

    pub fn java_path(&self) -> PathBuf {
        self.options.java_path()
    }

    pub fn game_dir(&self) -> PathBuf {
        self.options.game_dir()
    }
}
