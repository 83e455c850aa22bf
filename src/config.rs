//! Client configuration.
//!
//! # Examples
//!
//! ```
//! use restpose::config::{ClientConfig, WaitMode};
//!
//! let config = ClientConfig::default()
//!     .with_uri("http://search.example.com:7777/")
//!     .with_wait(WaitMode::Complete);
//! assert_eq!(config.uri, "http://search.example.com:7777");
//! assert_eq!(config.page_size, 20);
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{RestPoseError, Result};

/// Address of a server running locally with its default settings.
pub const DEFAULT_URI: &str = "http://127.0.0.1:7777";

/// Environment variable overriding the server address.
pub const URI_ENV_VAR: &str = "RESTPOSE_URI";

/// How long a write request waits on the server before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// Return as soon as the request has been received.
    None,
    /// Wait until the request has been queued for processing.
    Push,
    /// Wait until the request has been processed.
    #[default]
    Process,
    /// Wait until the request's effects are visible to searches.
    Complete,
}

impl WaitMode {
    /// The parameter value sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitMode::None => "none",
            WaitMode::Push => "push",
            WaitMode::Process => "process",
            WaitMode::Complete => "complete",
        }
    }
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitMode {
    type Err = RestPoseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(WaitMode::None),
            "push" => Ok(WaitMode::Push),
            "process" => Ok(WaitMode::Process),
            "complete" => Ok(WaitMode::Complete),
            other => Err(RestPoseError::invalid_config(format!(
                "unknown wait mode: {other}"
            ))),
        }
    }
}

/// Settings for connecting to a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address of the server, without a trailing slash.
    pub uri: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Connection timeout in milliseconds; no timeout when unset.
    pub connect_timeout_ms: Option<u64>,
    /// Whole-request timeout in milliseconds; no timeout when unset.
    pub request_timeout_ms: Option<u64>,
    /// Default wait mode for write requests.
    pub wait: WaitMode,
    /// Results fetched per page when iterating an unbounded window.
    pub page_size: u64,
    /// Delay between checkpoint polls in milliseconds.
    pub checkpoint_poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            user_agent: format!("restpose_rust/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_ms: None,
            request_timeout_ms: None,
            wait: WaitMode::default(),
            page_size: 20,
            checkpoint_poll_interval_ms: 1000,
        }
    }
}

impl ClientConfig {
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_wait(mut self, wait: WaitMode) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_checkpoint_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.checkpoint_poll_interval_ms = interval_ms;
        self
    }

    /// Load a configuration from a JSON file; missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the environment.
    pub fn from_env(self) -> Self {
        match std::env::var(URI_ENV_VAR) {
            Ok(uri) if !uri.is_empty() => self.with_uri(uri),
            _ => self,
        }
    }

    fn normalized(self) -> Self {
        let uri = self.uri.clone();
        self.with_uri(uri)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(RestPoseError::invalid_config(format!(
                "uri must be an http or https address, got {:?}",
                self.uri
            )));
        }
        if self.page_size == 0 {
            return Err(RestPoseError::invalid_config("page_size must be positive"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn checkpoint_poll_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.uri, DEFAULT_URI);
        assert_eq!(config.wait, WaitMode::Process);
        assert_eq!(config.checkpoint_poll_interval(), Duration::from_secs(1));
        assert!(config.user_agent.starts_with("restpose_rust/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"uri": "http://example.com:7777/", "wait": "complete", "page_size": 50}}"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.uri, "http://example.com:7777");
        assert_eq!(config.wait, WaitMode::Complete);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.checkpoint_poll_interval_ms, 1000);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"page_size": 0}}"#).unwrap();
        assert!(matches!(
            ClientConfig::from_file(file.path()),
            Err(RestPoseError::Config(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"wait": "eventually"}}"#).unwrap();
        assert!(matches!(
            ClientConfig::from_file(file.path()),
            Err(RestPoseError::Json(_))
        ));
    }

    #[test]
    fn test_from_file_missing_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        match ClientConfig::from_file(&path) {
            Err(RestPoseError::Anyhow(err)) => {
                assert!(err.to_string().contains("absent.json"));
                let io_err = err.downcast_ref::<std::io::Error>().unwrap();
                assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected a file error, got {other:?}"),
        }
    }

    #[test]
    fn test_wait_mode_parsing() {
        assert_eq!("push".parse::<WaitMode>().unwrap(), WaitMode::Push);
        assert_eq!(WaitMode::None.to_string(), "none");
        assert!("later".parse::<WaitMode>().is_err());
    }
}
