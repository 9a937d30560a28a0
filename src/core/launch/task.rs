// ─── Launch Task ───
// Spawns the game process and supervises it until exit.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{LaunchEvent, SharedSink};

use super::classpath::safe_path_str;

/// Exit code reported when the process status cannot be determined
/// (killed by a signal, or the wait itself failed).
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Run `<java> -version` and return the reported version string.
pub async fn check_java(java: &Path) -> LauncherResult<String> {
    let output = Command::new(java)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| LauncherError::ProcessSpawn {
            program: java.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(LauncherError::ProcessSpawn {
            program: java.to_path_buf(),
            reason: format!("`-version` exited with {}", output.status),
        });
    }

    // The JVM prints its banner on stderr.
    let banner = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    let version = banner
        .lines()
        .find_map(|line| {
            let start = line.find('"')?;
            let end = line[start + 1..].find('"')?;
            Some(line[start + 1..start + 1 + end].to_string())
        })
        .or_else(|| banner.lines().find(|l| !l.trim().is_empty()).map(|l| l.trim().to_string()))
        .unwrap_or_default();

    info!("Using Java {:?} ({})", java, version);
    Ok(version)
}

/// Handle on a running game.
pub struct GameProcess {
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit: JoinHandle<i32>,
}

impl GameProcess {
    /// OS process id, if the child was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the supervisor to kill the process. Returns `false` if it already
    /// exited or a kill was requested before.
    pub fn kill(&mut self) -> bool {
        match self.kill_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Wait for exit. The close event has been emitted when this returns.
    pub async fn wait(self) -> i32 {
        match self.exit.await {
            Ok(code) => code,
            Err(e) => {
                warn!("Game supervisor task failed: {}", e);
                UNKNOWN_EXIT_CODE
            }
        }
    }
}

/// Spawn `java` with `args` in `cwd`.
///
/// Output chunks are forwarded to `sink` as [`LaunchEvent::Data`]. Exactly one
/// [`LaunchEvent::Close`] follows once the process exits and both streams
/// are drained.
pub fn spawn_game(
    java: &Path,
    args: &[String],
    cwd: &Path,
    natives_dir: &Path,
    detached: bool,
    sink: SharedSink,
) -> LauncherResult<GameProcess> {
    let mut cmd = Command::new(java);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    configure_native_library_env(&mut cmd, natives_dir);
    if detached {
        configure_detached(&mut cmd);
    }

    let mut child = cmd.spawn().map_err(|e| LauncherError::ProcessSpawn {
        program: java.to_path_buf(),
        reason: e.to_string(),
    })?;
    let pid = child.id();
    info!("Game process started (pid {:?}, detached: {})", pid, detached);

    let stdout_task = child
        .stdout
        .take()
        .map(|out| forward_output(out, "stdout", sink.clone()));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| forward_output(err, "stderr", sink.clone()));

    let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

    let exit = tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            Ok(()) = &mut kill_rx => {
                info!("Killing game process {:?}", pid);
                if let Err(e) = child.kill().await {
                    warn!("Cannot kill game process {:?}: {}", pid, e);
                }
                child.wait().await
            }
        };

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }

        let code = match status {
            Ok(status) => status.code().unwrap_or(UNKNOWN_EXIT_CODE),
            Err(e) => {
                warn!("Waiting on game process failed: {}", e);
                UNKNOWN_EXIT_CODE
            }
        };
        info!("Game process exited with code {}", code);
        sink.emit(LaunchEvent::Close { code });
        code
    });

    Ok(GameProcess {
        pid,
        kill_tx: Some(kill_tx),
        exit,
    })
}

fn forward_output<R>(reader: R, stream: &'static str, sink: SharedSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    debug!("[mc][{}] {}", stream, text.trim_end());
                    sink.emit(LaunchEvent::Data { text });
                }
                Err(e) => {
                    warn!("Reading game {} failed: {}", stream, e);
                    break;
                }
            }
        }
    })
}

fn configure_native_library_env(cmd: &mut Command, natives_dir: &Path) {
    let native_path = safe_path_str(natives_dir);

    if cfg!(target_os = "windows") {
        cmd.env("PATH", prepend_env_path("PATH", &native_path));
    } else if cfg!(target_os = "macos") {
        cmd.env("DYLD_LIBRARY_PATH", prepend_env_path("DYLD_LIBRARY_PATH", &native_path));
    } else {
        cmd.env("LD_LIBRARY_PATH", prepend_env_path("LD_LIBRARY_PATH", &native_path));
    }
}

fn prepend_env_path(var_name: &str, value: &str) -> String {
    let separator = if cfg!(target_os = "windows") { ";" } else { ":" };
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

/// Put the child in its own process group so it outlives the caller.
fn configure_detached(cmd: &mut Command) {
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }
    #[cfg(windows)]
    {
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::events::RecordingSink;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn output_is_forwarded_and_close_is_emitted_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let args = vec!["-c".to_string(), "echo hello; echo oops 1>&2; exit 3".to_string()];

        let process = spawn_game(&sh(), &args, dir.path(), dir.path(), false, sink.clone()).unwrap();
        assert!(process.pid().is_some());
        assert_eq!(process.wait().await, 3);

        let events = sink.events();
        assert!(events.contains(&LaunchEvent::Data {
            text: "hello\n".into()
        }));
        assert!(events.contains(&LaunchEvent::Data {
            text: "oops\n".into()
        }));
        let closes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, LaunchEvent::Close { .. }))
            .collect();
        assert_eq!(closes, vec![&LaunchEvent::Close { code: 3 }]);
        assert!(matches!(events.last(), Some(LaunchEvent::Close { .. })));
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let args = vec!["-c".to_string(), r"printf 'a\377b\n'".to_string()];

        let process = spawn_game(&sh(), &args, dir.path(), dir.path(), false, sink.clone()).unwrap();
        assert_eq!(process.wait().await, 0);
        assert!(sink.events().contains(&LaunchEvent::Data {
            text: "a\u{FFFD}b\n".into()
        }));
    }

    #[tokio::test]
    async fn kill_terminates_and_still_closes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let args = vec!["-c".to_string(), "exec sleep 30".to_string()];

        let mut process =
            spawn_game(&sh(), &args, dir.path(), dir.path(), true, sink.clone()).unwrap();
        assert!(process.kill());
        assert!(!process.kill());
        assert_eq!(process.wait().await, UNKNOWN_EXIT_CODE);
        assert!(sink.events().contains(&LaunchEvent::Close {
            code: UNKNOWN_EXIT_CODE
        }));
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-java");

        let err = check_java(&missing).await.unwrap_err();
        assert!(matches!(err, LauncherError::ProcessSpawn { .. }));

        let sink = Arc::new(RecordingSink::default());
        let spawned = spawn_game(&missing, &[], dir.path(), dir.path(), false, sink);
        assert!(matches!(spawned, Err(LauncherError::ProcessSpawn { .. })));
    }

    #[tokio::test]
    async fn failing_version_probe_is_reported() {
        let err = check_java(Path::new("/bin/false")).await.unwrap_err();
        assert!(matches!(err, LauncherError::ProcessSpawn { .. }));
    }
}
