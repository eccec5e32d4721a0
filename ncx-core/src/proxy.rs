// ncx-core/src/proxy.rs

//! Runs the resolved binary with the caller's arguments and captures its output.

use crate::errors::ProxyError;
use crate::resolver::ResolvedBinary;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use tracing::{debug, info, warn};

/// Result of one child execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRun {
    /// Raw exit code of the child. Signal deaths are reported as `128 + signo`.
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedRun {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `binary` with `args`, blocking until it exits.
///
/// stdin is inherited unchanged. stdout and stderr are captured into separate
/// buffers, each drained on its own thread while the child runs, so a child
/// that floods both pipes cannot deadlock against an unread one.
///
/// No signal handler is installed here: an interrupt during the wait takes
/// the default action and ends the whole process.
pub fn run(binary: &ResolvedBinary, args: &[OsString]) -> Result<CapturedRun, ProxyError> {
    let path = binary.path();
    debug!(path = %path.display(), argc = args.len(), "Spawning child process");

    let output = duct::cmd(path, args)
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to spawn child process");
            if e.kind() == ErrorKind::NotFound {
                ProxyError::Vanished {
                    path: path.to_path_buf(),
                }
            } else {
                ProxyError::Spawn {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

    let exit_code = exit_code_of(output.status);
    info!(
        exit_code,
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "Child process finished"
    );

    Ok(CapturedRun {
        exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

fn exit_code_of(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}
