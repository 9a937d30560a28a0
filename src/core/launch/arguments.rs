// ─── Launch Arguments ───
// JVM flags, security patches, classpath and templated game arguments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::core::assets::AssetLayout;
use crate::core::auth::Identity;
use crate::core::config::{LaunchOptions, QuickPlayKind};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{FeatureSet, OsFamily, Platform, ReleaseVersion, VersionJson};

use super::classpath::{build_classpath, safe_path_str};

const LAUNCHER_NAME: &str = "mc-launch-core";
const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stability / compatibility flags every launch starts with.
pub const BASE_JVM_FLAGS: [&str; 4] = [
    "-XX:-UseAdaptiveSizePolicy",
    "-XX:-OmitStackTraceInFastThrow",
    "-Dfml.ignorePatchDiscrepancies=true",
    "-Dfml.ignoreInvalidMinecraftCertificates=true",
];

const WINDOWS_JVM_FLAG: &str =
    "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump";
const OSX_JVM_FLAG: &str = "-XstartOnFirstThread";
const LINUX_JVM_FLAG: &str = "-Xss1M";

/// Per-OS JVM flag. macOS only gets it from 1.13 on.
pub fn os_jvm_flag(os: OsFamily, release: Option<ReleaseVersion>) -> Option<&'static str> {
    match os {
        OsFamily::Windows => Some(WINDOWS_JVM_FLAG),
        OsFamily::Osx => release.filter(|r| r.minor > 12).map(|_| OSX_JVM_FLAG),
        OsFamily::Linux => Some(LINUX_JVM_FLAG),
    }
}

// ─── Log4Shell mitigations ───

/// Logging configuration shipped for one range of minor versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Log4jPatch {
    pub min_minor: u32,
    pub max_minor: u32,
    pub file_name: &'static str,
    pub url: &'static str,
}

pub const LOG4J_PATCHES: [Log4jPatch; 2] = [
    Log4jPatch {
        min_minor: 12,
        max_minor: 16,
        file_name: "log4j2_112-116.xml",
        url: "https://launcher.mojang.com/v1/objects/02937d122c86ce73319ef9975b58896fc1b491d1/log4j2_112-116.xml",
    },
    Log4jPatch {
        min_minor: 7,
        max_minor: 11,
        file_name: "log4j2_17-111.xml",
        url: "https://launcher.mojang.com/v1/objects/dd2b723346a8dcd48e7f4d245f6bf09e98db9696/log4j2_17-111.xml",
    },
];

pub const LOG4J_NO_LOOKUPS_FLAG: &str = "-Dlog4j2.formatMsgNoLookups=true";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPatch {
    /// Download the config and point `-Dlog4j.configurationFile` at it.
    ConfigFile(Log4jPatch),
    /// Append [`LOG4J_NO_LOOKUPS_FLAG`].
    NoLookups,
}

/// Table lookup: which mitigation a release id needs, if any.
///
/// 1.17.x and exactly 1.18 get the no-lookups flag; 1.7 through 1.16.x get a
/// patched logging config.
pub fn security_patch_for(version_id: &str) -> Option<SecurityPatch> {
    let release = ReleaseVersion::parse(version_id)?;
    match release.minor {
        17 => Some(SecurityPatch::NoLookups),
        18 if release.patch.is_none() => Some(SecurityPatch::NoLookups),
        minor => LOG4J_PATCHES
            .iter()
            .find(|c| (c.min_minor..=c.max_minor).contains(&minor))
            .copied()
            .map(SecurityPatch::ConfigFile),
    }
}

/// Append the mitigation for `version_id` to `flags`, downloading the
/// logging config into `config_dir` when one is needed.
pub async fn apply_security_patch(
    flags: &mut Vec<String>,
    version_id: &str,
    config_dir: &Path,
    downloader: &Downloader,
) -> LauncherResult<()> {
    match security_patch_for(version_id) {
        Some(SecurityPatch::NoLookups) => ensure_jvm_arg_present(flags, LOG4J_NO_LOOKUPS_FLAG),
        Some(SecurityPatch::ConfigFile(config)) => {
            if flags
                .iter()
                .any(|flag| flag.contains("log4j.configurationFile"))
            {
                return Ok(());
            }
            let dest = config_dir.join(config.file_name);
            downloader.download_file(config.url, &dest).await?;
            flags.push(format!("-Dlog4j.configurationFile={}", safe_path_str(&dest)));
        }
        None => {}
    }
    Ok(())
}

// ─── Final command line ───

/// Everything after the java executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArguments {
    pub jvm: Vec<String>,
    pub classpath: String,
    pub main_class: String,
    pub game: Vec<String>,
}

impl LaunchArguments {
    /// `jvm.. -cp <classpath> <main class> game..`
    pub fn command_line(&self) -> Vec<String> {
        let mut line = Vec::with_capacity(self.jvm.len() + self.game.len() + 3);
        line.extend(self.jvm.iter().cloned());
        line.push("-cp".into());
        line.push(self.classpath.clone());
        line.push(self.main_class.clone());
        line.extend(self.game.iter().cloned());
        line
    }
}

/// Replace the access token for log output.
pub fn redacted(args: &[String], identity: &Identity) -> Vec<String> {
    args.iter()
        .map(|arg| {
            if identity.access_token.is_empty() {
                arg.clone()
            } else {
                arg.replace(&identity.access_token, "<access token>")
            }
        })
        .collect()
}

pub struct ArgumentBuilder<'a> {
    pub version: &'a VersionJson,
    pub options: &'a LaunchOptions,
    pub identity: &'a Identity,
    pub platform: Platform,
}

impl<'a> ArgumentBuilder<'a> {
    pub fn new(
        version: &'a VersionJson,
        options: &'a LaunchOptions,
        identity: &'a Identity,
        platform: Platform,
    ) -> Self {
        Self {
            version,
            options,
            identity,
            platform,
        }
    }

    /// Window flags are appended explicitly, so `has_custom_resolution`
    /// stays off to avoid a second `--width`.
    pub fn features(&self) -> FeatureSet {
        FeatureSet {
            is_demo_user: self.options.demo,
            has_custom_resolution: false,
        }
    }

    /// Compose the full argument list. Nothing partial is ever returned.
    pub async fn build(
        &self,
        natives_dir: &Path,
        libraries: &[PathBuf],
        layout: &AssetLayout,
        downloader: &Downloader,
    ) -> LauncherResult<LaunchArguments> {
        let main_class = self.version.main_class()?.to_string();

        let client_jar = self.options.client_jar_path();
        if !client_jar.exists() {
            return Err(LauncherError::LaunchConfig(format!(
                "runtime jar missing at {:?}",
                client_jar
            )));
        }

        let classpath = build_classpath(libraries, &client_jar, self.platform.os);
        let mut jvm = self.jvm_flags(natives_dir, &classpath);
        apply_security_patch(
            &mut jvm,
            &self.version.id,
            &self.options.game_dir(),
            downloader,
        )
        .await?;

        let game = self.game_arguments(layout)?;

        info!(
            "Built launch arguments: {} JVM flags, {} game arguments",
            jvm.len(),
            game.len()
        );

        Ok(LaunchArguments {
            jvm,
            classpath,
            main_class,
            game,
        })
    }

    /// Baseline flags, natives path, heap, OS flag, descriptor JVM tokens,
    /// then caller flags verbatim.
    pub fn jvm_flags(&self, natives_dir: &Path, classpath: &str) -> Vec<String> {
        let mut flags: Vec<String> = BASE_JVM_FLAGS.iter().map(|f| f.to_string()).collect();
        flags.push(format!(
            "-Djava.library.path={}",
            safe_path_str(natives_dir)
        ));
        flags.push(format!("-Xmx{}", self.options.memory.max.to_jvm()));
        flags.push(format!("-Xms{}", self.options.memory.min.to_jvm()));

        if let Some(flag) = os_jvm_flag(self.platform.os, self.version.release()) {
            flags.push(flag.to_string());
        }

        for arg in self.descriptor_jvm_args(natives_dir, classpath) {
            ensure_jvm_arg_present(&mut flags, &arg);
        }

        flags.extend(self.options.custom_args.iter().cloned());
        flags
    }

    /// `arguments.jvm` of modern descriptors, minus what this builder
    /// already emits itself (classpath and natives path).
    fn descriptor_jvm_args(&self, natives_dir: &Path, classpath: &str) -> Vec<String> {
        let raw: Vec<String> = self
            .version
            .jvm_tokens(&self.platform, &self.features())
            .into_iter()
            .filter_map(|token| match token {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();

        let natives = safe_path_str(natives_dir);
        let library_dir = safe_path_str(&self.options.libraries_dir());
        let mut sanitized = Vec::new();
        let mut i = 0;

        while i < raw.len() {
            let arg = &raw[i];

            if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
                i += 2;
                continue;
            }
            if arg.starts_with("-Djava.library.path=") {
                i += 1;
                continue;
            }

            let resolved = arg
                .replace("${natives_directory}", &natives)
                .replace("${library_directory}", &library_dir)
                .replace("${classpath_separator}", self.platform.os.path_separator())
                .replace("${classpath}", classpath)
                .replace("${launcher_name}", LAUNCHER_NAME)
                .replace("${launcher_version}", LAUNCHER_VERSION)
                .replace("${version_name}", &self.options.version.number);

            // Unresolvable placeholders would reach the JVM verbatim.
            if resolved.contains("${") {
                debug!("Dropping unresolved JVM argument {}", arg);
                drop_dangling_option(&mut sanitized);
                i += 1;
                continue;
            }

            sanitized.push(resolved);
            i += 1;
        }

        sanitized
    }

    /// Placeholder → value table for game arguments.
    pub fn placeholder_table(&self, layout: &AssetLayout) -> LauncherResult<HashMap<&'static str, String>> {
        let assets_index = self.version.asset_index_id().ok_or_else(|| {
            LauncherError::LaunchConfig(format!("{} declares no asset index", self.version.id))
        })?;
        let identity = self.identity;
        let window = self.options.window.clone().unwrap_or_default();

        let mut table = HashMap::new();
        table.insert("${auth_access_token}", identity.access_token.clone());
        table.insert("${auth_session}", identity.access_token.clone());
        table.insert("${auth_player_name}", identity.name.clone());
        table.insert("${auth_uuid}", identity.uuid.clone());
        table.insert(
            "${auth_xuid}",
            identity
                .xuid
                .clone()
                .unwrap_or_else(|| identity.access_token.clone()),
        );
        table.insert(
            "${user_properties}",
            identity.user_properties_or_empty().to_string(),
        );
        table.insert("${user_type}", identity.user_type.clone());
        table.insert("${clientid}", identity.client_token.clone());
        table.insert("${version_name}", self.options.version.number.clone());
        table.insert("${version_type}", self.options.version.version_type.clone());
        table.insert("${assets_index_name}", assets_index.to_string());
        table.insert(
            "${game_directory}",
            safe_path_str(&self.options.game_dir()),
        );
        table.insert("${assets_root}", safe_path_str(&layout.assets_root));
        table.insert("${game_assets}", safe_path_str(&layout.game_assets));
        table.insert(
            "${resolution_width}",
            window.width.unwrap_or(856).to_string(),
        );
        table.insert(
            "${resolution_height}",
            window.height.unwrap_or(482).to_string(),
        );
        Ok(table)
    }

    /// Descriptor game arguments with placeholders substituted, followed by
    /// window, quick play / server and custom launch flags.
    pub fn game_arguments(&self, layout: &AssetLayout) -> LauncherResult<Vec<String>> {
        let table = self.placeholder_table(layout)?;
        let tokens = self.version.game_tokens(&self.platform, &self.features());
        let mut args = finalize_tokens(substitute_tokens(tokens, &table));

        if let Some(window) = &self.options.window {
            if window.fullscreen {
                args.push("--fullscreen".into());
            } else {
                if let Some(width) = window.width {
                    args.push("--width".into());
                    args.push(width.to_string());
                }
                if let Some(height) = window.height {
                    args.push("--height".into());
                    args.push(height.to_string());
                }
            }
        }

        if let Some(quick_play) = &self.options.quick_play {
            let flag = match quick_play.kind {
                QuickPlayKind::Singleplayer => "--quickPlaySingleplayer",
                QuickPlayKind::Multiplayer => "--quickPlayMultiplayer",
                QuickPlayKind::Realms => "--quickPlayRealms",
            };
            args.push(flag.into());
            args.push(quick_play.identifier.clone());
            if let Some(path) = &quick_play.path {
                args.push("--quickPlayPath".into());
                args.push(path.clone());
            }
        } else if let Some(server) = &self.options.server {
            args.push("--server".into());
            args.push(server.host.clone());
            args.push("--port".into());
            args.push(server.port.unwrap_or(25565).to_string());
        }

        args.extend(self.options.custom_launch_args.iter().cloned());
        Ok(args)
    }
}

/// Whole-token substitution. Unknown tokens and non-string values pass
/// through untouched.
pub fn substitute_tokens(tokens: Vec<Value>, table: &HashMap<&'static str, String>) -> Vec<Value> {
    tokens
        .into_iter()
        .map(|token| match token {
            Value::String(s) => match table.get(s.as_str()) {
                Some(value) => Value::String(value.clone()),
                None => Value::String(s),
            },
            other => other,
        })
        .collect()
}

/// Keep plain strings and numbers, drop everything else.
pub fn finalize_tokens(tokens: Vec<Value>) -> Vec<String> {
    tokens
        .into_iter()
        .filter_map(|token| match token {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn ensure_jvm_arg_present(args: &mut Vec<String>, arg: &str) {
    if args.iter().any(|existing| existing == arg) {
        return;
    }
    args.push(arg.to_string());
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-') && !last.contains('=')) {
        let _ = args.pop();
    }
}
