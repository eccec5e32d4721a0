// ncx-core/src/errors.rs
use std::path::PathBuf;
use thiserror::Error;

/// Exit status reserved for "the underlying tool could not be run at all".
///
/// Used for both resolution and spawn failures so scripts can tell a proxy
/// failure apart from the wrapped tool's own non-zero codes.
pub const SENTINEL_EXIT_CODE: u8 = 2;

/// Errors that happen before a child process exists.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// No executable found in any of the searched locations.
    #[error("could not locate the real {program} (searched: {})", display_paths(.searched))]
    NotFound {
        program: String,
        searched: Vec<PathBuf>,
    },

    /// The override variable names a path that is missing or not executable.
    #[error("{var} is set to {}, which is not an executable file", .path.display())]
    InvalidOverride { var: String, path: PathBuf },

    /// The binary disappeared between resolution and execution.
    #[error("{} not found at spawn time", .path.display())]
    Vanished { path: PathBuf },

    /// Any other failure to start the child (permissions, resource limits).
    #[error("failed to run {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProxyError {
    /// All proxy errors are fatal and share the sentinel exit code.
    pub fn exit_code(&self) -> u8 {
        SENTINEL_EXIT_CODE
    }

    /// True for resolution failures, where the operator should set the override.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            ProxyError::NotFound { .. } | ProxyError::InvalidOverride { .. }
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the interpretation backend. Never fatal to the run.
#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("{0} is not set")]
    MissingApiKey(String),

    #[error("request to interpretation backend failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("interpretation backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response from interpretation backend: {0}")]
    MalformedResponse(String),
}
