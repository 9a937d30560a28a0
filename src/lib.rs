pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::auth::Identity;
pub use crate::core::config::LaunchOptions;
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::events::{
    ChannelSink, EventSink, LaunchEvent, NullSink, RecordingSink, SharedSink,
};
pub use crate::core::launch::{GameProcess, LaunchContext, Launcher, ORCHESTRATION_FAILURE_EXIT};

/// Install the default `tracing` subscriber.
///
/// `RUST_LOG` wins over the built-in filter. Calling this twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mc_launch_core=debug")),
        )
        .try_init();
}
