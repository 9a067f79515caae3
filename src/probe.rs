// Media probing - external ffprobe/ffmpeg invocation with a bounded wait
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Upper bound on a duration probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single-frame extraction.
pub const EXTRACT_TIMEOUT: Duration = Duration::from_secs(20);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Failure of an external media command. Callers treat these as degraded
/// results (fallback duration, missing artifact), never as a crash.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while waiting for {command}: {source}")]
    Wait {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} timed out after {timeout:?}")]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },
    #[error("{command} exited with {status}")]
    Exit {
        command: &'static str,
        status: ExitStatus,
    },
    #[error("unparsable {command} output: {output:?}")]
    Parse {
        command: &'static str,
        output: String,
    },
    #[error("{command} did not produce {path}")]
    MissingOutput {
        command: &'static str,
        path: PathBuf,
    },
}

/// Seam for the two external media operations. Production code uses
/// [`CommandProbe`]; tests substitute a stub so no ffmpeg install is needed.
pub trait MediaProbe: Send + Sync {
    /// Duration of the video in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64, CommandError>;

    /// Extract one frame at `timestamp` seconds into `out_path`.
    fn extract_frame(&self, path: &Path, timestamp: f64, out_path: &Path)
        -> Result<(), CommandError>;
}

/// Shells out to `ffprobe` / `ffmpeg`. Each call spawns exactly one process
/// and must run off the control thread.
#[derive(Debug, Default)]
pub struct CommandProbe;

impl MediaProbe for CommandProbe {
    fn probe_duration(&self, path: &Path) -> Result<f64, CommandError> {
        let mut cmd = Command::new("ffprobe");
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path);

        let stdout = run_with_timeout("ffprobe", cmd, PROBE_TIMEOUT, true)?;
        let trimmed = stdout.trim();
        trimmed.parse::<f64>().map_err(|_| CommandError::Parse {
            command: "ffprobe",
            output: trimmed.to_string(),
        })
    }

    fn extract_frame(
        &self,
        path: &Path,
        timestamp: f64,
        out_path: &Path,
    ) -> Result<(), CommandError> {
        let seek = format!("{timestamp:.3}");
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-ss", seek.as_str(), "-i"])
            .arg(path)
            .args(["-vframes", "1"])
            .arg(out_path);

        run_with_timeout("ffmpeg", cmd, EXTRACT_TIMEOUT, false)?;

        // ffmpeg can exit zero without writing anything (e.g. seek past EOF).
        if !out_path.exists() {
            return Err(CommandError::MissingOutput {
                command: "ffmpeg",
                path: out_path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Run a command to completion, killing and reaping it if `timeout` elapses
/// first. Returns captured stdout when `capture_stdout` is set.
fn run_with_timeout(
    command: &'static str,
    mut cmd: Command,
    timeout: Duration,
    capture_stdout: bool,
) -> Result<String, CommandError> {
    cmd.stdin(Stdio::null()).stderr(Stdio::null());
    cmd.stdout(if capture_stdout {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd
        .spawn()
        .map_err(|source| CommandError::Spawn { command, source })?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child
            .try_wait()
            .map_err(|source| CommandError::Wait { command, source })?
        {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!("{command} killed after {timeout:?}");
                return Err(CommandError::Timeout { command, timeout });
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_string(&mut stdout);
    }

    if !status.success() {
        return Err(CommandError::Exit { command, status });
    }
    Ok(stdout)
}
