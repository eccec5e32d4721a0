// ncx-core/src/resolver.rs

//! Locates the real executable to proxy.
//!
//! Lookups run in strict priority order: the operator's override, then a fixed
//! list of conventional install paths, then a `PATH` search. Each check is a
//! plain filesystem predicate so the selection logic can be tested without
//! spawning anything.
//!
//! When the override is set it is trusted exclusively. An override that does
//! not point at an executable fails resolution instead of falling back, so a
//! typo in `NC_REAL` can never silently select a different `nc`.

use crate::errors::ProxyError;
use nix::unistd::{AccessFlags, access};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PROGRAM_NAME: &str = "nc";

/// Conventional install locations, checked in order.
pub const DEFAULT_CANDIDATES: &[&str] = &["/usr/bin/nc", "/bin/nc", "/usr/local/bin/nc", "/sbin/nc"];

/// Which lookup produced a [`ResolvedBinary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Override,
    Candidate,
    SearchPath,
}

/// Absolute path to an executable that passed the access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinary {
    path: PathBuf,
    source: ResolutionSource,
}

impl ResolvedBinary {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> ResolutionSource {
        self.source
    }
}

/// True if `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => access(path, AccessFlags::X_OK).is_ok(),
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    program: String,
    override_var: String,
    override_path: Option<PathBuf>,
    candidates: Vec<PathBuf>,
    search_path: Option<OsString>,
    cwd: PathBuf,
    exclude: Option<PathBuf>,
}

impl Resolver {
    /// Resolver for `nc` using the process environment.
    ///
    /// The running executable is excluded from every lookup so that installing
    /// the proxy as `nc` cannot make it invoke itself.
    pub fn new(override_path: Option<PathBuf>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let exclude = std::env::current_exe().ok();
        Self {
            program: PROGRAM_NAME.to_string(),
            override_var: crate::config::OVERRIDE_ENV_VAR.to_string(),
            override_path,
            candidates: DEFAULT_CANDIDATES.iter().map(PathBuf::from).collect(),
            search_path: std::env::var_os("PATH"),
            cwd,
            exclude,
        }
    }

    pub fn with_candidates<I, P>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn excluding(mut self, exclude: Option<PathBuf>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn override_var(&self) -> &str {
        &self.override_var
    }

    pub fn resolve(&self) -> Result<ResolvedBinary, ProxyError> {
        if let Some(raw) = &self.override_path {
            let path = self.cwd.join(raw);
            debug!(path = %path.display(), "Checking override path");
            if self.is_usable(&path) {
                return Ok(self.found(path, ResolutionSource::Override));
            }
            return Err(ProxyError::InvalidOverride {
                var: self.override_var.clone(),
                path,
            });
        }

        for candidate in &self.candidates {
            debug!(path = %candidate.display(), "Checking candidate path");
            if self.is_usable(candidate) {
                return Ok(self.found(candidate.clone(), ResolutionSource::Candidate));
            }
        }

        if let Some(path) = self.search_path_lookup() {
            return Ok(self.found(path, ResolutionSource::SearchPath));
        }

        Err(ProxyError::NotFound {
            program: self.program.clone(),
            searched: self.candidates.clone(),
        })
    }

    fn search_path_lookup(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        let matches = match which::which_in_all(&self.program, Some(search_path), &self.cwd) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(error = %e, "PATH lookup failed");
                return None;
            }
        };
        matches
            .map(|p| self.cwd.join(p))
            .find(|p| self.is_usable(p))
    }

    fn is_usable(&self, path: &Path) -> bool {
        is_executable(path) && !self.is_excluded(path)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(exclude) = &self.exclude else {
            return false;
        };
        match (path.canonicalize(), exclude.canonicalize()) {
            (Ok(a), Ok(b)) if a == b => {
                debug!(path = %path.display(), "Skipping path that points back at this proxy");
                true
            }
            _ => false,
        }
    }

    fn found(&self, path: PathBuf, source: ResolutionSource) -> ResolvedBinary {
        info!(path = %path.display(), source = ?source, "Resolved {}", self.program);
        ResolvedBinary { path, source }
    }
}
