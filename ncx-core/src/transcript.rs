// ncx-core/src/transcript.rs

//! Packages a finished run into the text handed to the interpretation step.

use crate::proxy::CapturedRun;
use crate::resolver::ResolvedBinary;
use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;

/// Placeholder for a stream that is empty or whitespace-only.
pub const EMPTY_MARKER: &str = "(empty)";

/// Command line, exit code and decoded output of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub command_line: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Transcript {
    /// Decodes the captured streams. Invalid UTF-8 becomes U+FFFD; never fails.
    pub fn assemble(command_line: String, run: &CapturedRun) -> Transcript {
        Transcript {
            command_line,
            exit_code: run.exit_code,
            stdout: decode(&run.stdout).into_owned(),
            stderr: decode(&run.stderr).into_owned(),
        }
    }

    pub fn stdout_or_marker(&self) -> &str {
        or_marker(&self.stdout)
    }

    pub fn stderr_or_marker(&self) -> &str {
        or_marker(&self.stderr)
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Raw nc command:\n```\n{}\n```\n\nExit code: {}\n\nstdout:\n```\n{}\n```\n\nstderr:\n```\n{}\n```",
            self.command_line,
            self.exit_code,
            self.stdout_or_marker(),
            self.stderr_or_marker()
        )
    }
}

/// Lossy UTF-8 decoding shared by the transcript and the console echo.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn or_marker(text: &str) -> &str {
    if text.trim().is_empty() {
        EMPTY_MARKER
    } else {
        text
    }
}

/// Shell-quoted rendering of the invocation, for display only.
pub fn command_line(binary: &ResolvedBinary, args: &[OsString]) -> String {
    std::iter::once(binary.path().as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|arg| {
            let lossy = arg.to_string_lossy();
            match shlex::try_quote(&lossy) {
                Ok(quoted) => quoted.into_owned(),
                Err(_) => lossy.escape_debug().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
