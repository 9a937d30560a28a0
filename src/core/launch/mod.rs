// ─── Launcher ───
// Orchestrates one provisioning + launch invocation:
// resolve → jar → natives → classpath → assets → arguments → spawn.

pub mod arguments;
pub mod classpath;
pub mod context;
pub mod natives;
pub mod task;

use std::sync::Arc;

use tracing::{error, info};

use crate::core::assets::{AssetLayout, AssetManager};
use crate::core::auth::Identity;
use crate::core::config::LaunchOptions;
use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LaunchEvent, SharedSink};
use crate::core::http::{Fetcher, HttpFetcher};
use crate::core::version::{Platform, VersionJson, VersionResolver};

pub use arguments::{
    security_patch_for, ArgumentBuilder, LaunchArguments, Log4jPatch, SecurityPatch,
    BASE_JVM_FLAGS, LOG4J_PATCHES, LOG4J_NO_LOOKUPS_FLAG,
};
pub use classpath::build_classpath;
pub use context::LaunchContext;
pub use natives::{ArchiveExtractor, NativesOutcome, ZipExtractor};
pub use task::{check_java, spawn_game, GameProcess};

/// Close code emitted when the invocation fails before the game runs.
pub const ORCHESTRATION_FAILURE_EXIT: i32 = 1;

pub struct Launcher {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn ArchiveExtractor>,
    platform: Platform,
}

impl Launcher {
    /// Launcher for the current platform using `fetcher` for every download.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(ZipExtractor),
            platform: Platform::current(),
        }
    }

    /// Launcher backed by a real HTTP client honoring the configured timeout.
    pub fn with_http(options: &LaunchOptions) -> LauncherResult<Self> {
        let fetcher = HttpFetcher::new(options.fetch_timeout())?;
        Ok(Self::new(Arc::new(fetcher)))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    fn downloader(&self, options: &LaunchOptions) -> Downloader {
        Downloader::new(self.fetcher.clone())
            .with_concurrency(options.max_sockets())
            .with_timeout(options.fetch_timeout())
    }

    /// Materialize everything the game needs and assemble its command line.
    ///
    /// Emits the [`LaunchEvent::Arguments`] event on success. Nothing is
    /// spawned.
    pub async fn prepare(
        &self,
        options: &LaunchOptions,
        identity: &Identity,
        sink: &dyn EventSink,
    ) -> LauncherResult<LaunchContext> {
        tokio::fs::create_dir_all(&options.root)
            .await
            .map_err(|e| LauncherError::io(&options.root, e))?;

        let version = VersionResolver::new(self.fetcher.as_ref(), options)
            .resolve(sink)
            .await?;
        info!(
            "Preparing {} ({})",
            version.id,
            version.version_type.as_deref().unwrap_or("unknown")
        );

        let downloader = self.downloader(options);

        let client_jar = self.ensure_client_jar(&version, options, &downloader, sink).await?;

        let natives = natives::prepare_natives(
            &version,
            options,
            &self.platform,
            &downloader,
            self.extractor.as_ref(),
            sink,
        )
        .await?;

        let libraries = classpath::download_libraries(
            &version,
            &options.libraries_dir(),
            &self.platform,
            &downloader,
            sink,
        )
        .await?;

        let asset_info = version.asset_index_info()?.clone();
        let index = AssetManager::download_assets(&asset_info, options, &downloader, sink).await?;
        let assets = AssetLayout::for_index(&index, options);

        let arguments = ArgumentBuilder::new(&version, options, identity, self.platform)
            .build(&natives.directory, &libraries, &assets, &downloader)
            .await?;

        let context = LaunchContext {
            options: options.clone(),
            identity: identity.clone(),
            platform: self.platform,
            version,
            client_jar,
            libraries,
            natives_dir: natives.directory,
            native_failures: natives.failures,
            assets,
            arguments,
        };

        info!("Launch command: {}", context.command_line_for_logs());
        sink.emit(LaunchEvent::Arguments {
            args: context.command_line(),
        });
        Ok(context)
    }

    /// Prepare, verify the Java runtime, and spawn the game.
    ///
    /// Any failure before the process starts is reported as a debug event
    /// followed by `Close(ORCHESTRATION_FAILURE_EXIT)` and returned.
    pub async fn launch(
        &self,
        options: &LaunchOptions,
        identity: &Identity,
        sink: SharedSink,
    ) -> LauncherResult<GameProcess> {
        match self.try_launch(options, identity, sink.clone()).await {
            Ok(process) => Ok(process),
            Err(err) => {
                error!("Launch of {} failed: {}", options.version.number, err);
                sink.debug(format!("Launch failed: {}", err));
                sink.emit(LaunchEvent::Close {
                    code: ORCHESTRATION_FAILURE_EXIT,
                });
                Err(err)
            }
        }
    }

    async fn try_launch(
        &self,
        options: &LaunchOptions,
        identity: &Identity,
        sink: SharedSink,
    ) -> LauncherResult<GameProcess> {
        let context = self.prepare(options, identity, sink.as_ref()).await?;

        let java = context.java_path();
        check_java(&java).await?;

        let game_dir = context.game_dir();
        tokio::fs::create_dir_all(&game_dir)
            .await
            .map_err(|e| LauncherError::io(&game_dir, e))?;

        spawn_game(
            &java,
            &context.command_line(),
            &game_dir,
            &context.natives_dir,
            options.overrides.detached,
            sink,
        )
    }

    /// Download the runtime jar unless the caller supplied their own.
    async fn ensure_client_jar(
        &self,
        version: &VersionJson,
        options: &LaunchOptions,
        downloader: &Downloader,
        sink: &dyn EventSink,
    ) -> LauncherResult<std::path::PathBuf> {
        let jar = options.client_jar_path();
        if options.overrides.client_jar.is_some() {
            sink.debug(format!("Using custom runtime jar {:?}", jar));
            return Ok(jar);
        }

        let client = version.client_download()?;
        let entry = DownloadEntry::new(&client.url, jar.clone())
            .with_sha1(client.sha1.clone())
            .with_size(client.size);
        downloader.download_batch("version-jar", vec![entry], sink).await?;
        sink.debug(format!("Downloaded version jar for {}", version.id));
        Ok(jar)
    }
}
