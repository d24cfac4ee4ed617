//! Engine configuration for client apps.
//!
//! The host shell (mobile UI) resolves the API endpoint and bearer credential
//! through its own auth flow and hands them to the engine here. Secret
//! credentials live in the platform secure store, never on disk with the
//! engine's data.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Validated configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    api_base_url: String,
    api_token: String,
    db_path: PathBuf,
}

impl EngineConfig {
    /// Validate and normalize the raw values supplied by the host shell.
    pub fn new(
        api_base_url: impl Into<String>,
        api_token: impl Into<String>,
        db_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let api_base_url = normalize_base_url(api_base_url.into())?;
        let api_token = normalize_text_option(Some(api_token.into()))
            .ok_or_else(|| Error::InvalidInput("API token must not be empty".to_string()))?;

        Ok(Self {
            api_base_url,
            api_token,
            db_path: db_path.into(),
        })
    }

    /// Normalized API base URL (no trailing slash).
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Bearer credential attached to every collection request.
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Path of the local store database file.
    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_invalid_base_url() {
        assert!(EngineConfig::new("", "token", "/tmp/sync.db").is_err());
        assert!(EngineConfig::new("api.example.com", "token", "/tmp/sync.db").is_err());
    }

    #[test]
    fn config_rejects_empty_token() {
        assert!(EngineConfig::new("https://api.example.com", "   ", "/tmp/sync.db").is_err());
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config =
            EngineConfig::new("https://api.example.com/api/", " token ", "/tmp/sync.db").unwrap();
        assert_eq!(config.api_base_url(), "https://api.example.com/api");
        assert_eq!(config.api_token(), "token");
    }
}
