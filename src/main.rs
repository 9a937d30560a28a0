// Command-line entry: `mc-launch <options.json> [player name] [--root <dir>]`
//
// Launches offline with the given player name and mirrors every launch event
// into the log until the game closes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};

use mc_launch_core::{
    init_tracing, ChannelSink, Identity, LaunchEvent, LaunchOptions, Launcher, LauncherResult,
};

#[derive(Debug, Parser)]
#[command(name = "mc-launch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download and launch a Minecraft: Java Edition version offline")]
struct Cli {
    /// Launch options JSON file
    options: PathBuf,

    /// Offline player name
    #[arg(default_value = "Player")]
    player: String,

    /// Minecraft directory, overriding `root` from the options file
    /// (which itself defaults to `<data dir>/.minecraft`)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

impl Cli {
    fn load_options(&self) -> LauncherResult<LaunchOptions> {
        let mut options = LaunchOptions::from_json_file(&self.options)?;
        if let Some(root) = &self.root {
            options.root = root.clone();
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> LauncherResult<i32> {
    let options = cli.load_options()?;
    let identity = Identity::offline(&cli.player);
    let launcher = Launcher::with_http(&options)?;

    let (sink, mut events) = ChannelSink::new();
    info!(
        "Launching {} for {} from {:?}",
        options.version.number, identity.name, options.root
    );

    let process = launcher.launch(&options, &identity, Arc::new(sink)).await?;
    info!("Game running (pid {:?})", process.pid());

    while let Some(event) = events.recv().await {
        match event {
            LaunchEvent::Progress(p) => debug!("[{}] {}/{}", p.category, p.completed, p.total),
            LaunchEvent::Debug { message } => debug!("{}", message),
            LaunchEvent::Arguments { args } => debug!("{} launch arguments", args.len()),
            LaunchEvent::Data { text } => print!("{}", text),
            LaunchEvent::Close { code } => {
                info!("Game closed with code {}", code);
                break;
            }
        }
    }

    Ok(process.wait().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_and_version_are_handled_by_clap() {
        let help = Cli::try_parse_from(["mc-launch", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        let version = Cli::try_parse_from(["mc-launch", "--version"]).unwrap_err();
        assert_eq!(version.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn player_defaults_and_root_is_optional() {
        let cli = Cli::try_parse_from(["mc-launch", "opts.json"]).unwrap();
        assert_eq!(cli.options, PathBuf::from("opts.json"));
        assert_eq!(cli.player, "Player");
        assert!(cli.root.is_none());

        let cli = Cli::try_parse_from(["mc-launch", "opts.json", "Steve", "--root", "/games/mc"])
            .unwrap();
        assert_eq!(cli.player, "Steve");
        assert_eq!(cli.root, Some(PathBuf::from("/games/mc")));
    }

    #[test]
    fn missing_options_path_is_a_usage_error() {
        let err = Cli::try_parse_from(["mc-launch"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn root_flag_overrides_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"root": "/from/file", "version": {"number": "1.20.1"}}"#).unwrap();

        let from_file = Cli::try_parse_from(["mc-launch", path.to_str().unwrap()]).unwrap();
        assert_eq!(from_file.load_options().unwrap().root, PathBuf::from("/from/file"));

        let overridden =
            Cli::try_parse_from(["mc-launch", path.to_str().unwrap(), "--root", "/from/cli"])
                .unwrap();
        assert_eq!(overridden.load_options().unwrap().root, PathBuf::from("/from/cli"));
    }
}
