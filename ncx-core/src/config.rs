// ncx-core/src/config.rs

//! Runtime configuration read from environment variables.

use anyhow::{Context, Result, anyhow};
use std::ffi::OsString;
use std::path::PathBuf;
use url::Url;

pub const OVERRIDE_ENV_VAR: &str = "NC_REAL";
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_ENV_VAR: &str = "OPENAI_MODEL";
pub const BASE_URL_ENV_VAR: &str = "OPENAI_BASE_URL";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings for one proxied invocation.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Explicit path of the real binary, if the operator set one.
    pub override_path: Option<PathBuf>,
    pub backend: BackendConfig,
}

/// Where and how to reach the interpretation backend.
///
/// Nothing here is validated at load time: a broken backend setting must
/// never stop the wrapped tool from running, so problems surface when
/// interpretation is attempted.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
}

impl ProxyConfig {
    pub fn from_env() -> ProxyConfig {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds the config from an arbitrary variable lookup.
    ///
    /// The override is taken as raw OS bytes and only an empty value counts
    /// as unset, so any non-empty `NC_REAL` is resolved (and may fail closed).
    /// Backend settings must be UTF-8; blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> ProxyConfig
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let get = |key: &str| {
            lookup(key)
                .and_then(|v| v.into_string().ok())
                .filter(|v| !v.trim().is_empty())
        };

        let override_path = lookup(OVERRIDE_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let backend = BackendConfig {
            api_key: get(API_KEY_ENV_VAR),
            model_name: get(MODEL_ENV_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get(BASE_URL_ENV_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };

        tracing::debug!(
            override_set = override_path.is_some(),
            api_key_set = backend.api_key.is_some(),
            model = %backend.model_name,
            base_url = %backend.base_url,
            "Loaded proxy configuration"
        );

        ProxyConfig {
            override_path,
            backend,
        }
    }
}

impl BackendConfig {
    /// The chat completion URL derived from `base_url`.
    pub fn endpoint(&self) -> Result<Url> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let url = Url::parse(&format!("{}/chat/completions", trimmed)).with_context(|| {
            format!(
                "Invalid URL format for {} ('{}').",
                BASE_URL_ENV_VAR, self.base_url
            )
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!(
                "{} must be an http(s) URL, got scheme '{}'.",
                BASE_URL_ENV_VAR,
                url.scheme()
            ));
        }
        Ok(url)
    }
}
