//! Run configuration, loaded from a TOML file.
//!
//! ```toml
//! log_dir = "/var/log/hiscounts"
//! proxies = ["https://proxy-a.example/fetch", "https://proxy-b.example/fetch"]
//!
//! [wiki.en]
//! api_path = "https://runescape.wiki/api.php"
//! username = "CountsBot"
//! password = "..."
//!
//! [wiki.pt_br]
//! api_path = "https://pt.runescape.wiki/api.php"
//! username = "CountsBot"
//! password = "..."
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Credentials and endpoint for one wiki.
#[derive(Clone, Deserialize)]
pub struct WikiConfig {
    pub api_path: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for WikiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikiConfig")
            .field("api_path", &self.api_path)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// The per-language wiki sections. English is mandatory: it seeds the run
/// and is the canonical module.
#[derive(Debug, Clone, Deserialize)]
pub struct WikiLanguages {
    pub en: WikiConfig,
    pub pt_br: Option<WikiConfig>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory for log files and count snapshots.
    pub log_dir: PathBuf,

    /// Proxy endpoints that forward to a `url` query parameter. Empty means
    /// direct requests.
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Seconds before the same proxy may be re-used.
    #[serde(default = "default_proxy_delay")]
    pub proxy_delay: u64,

    /// Seconds between any two hiscores requests.
    #[serde(default = "default_request_pacing")]
    pub request_pacing: u64,

    pub wiki: WikiLanguages,
}

fn default_proxy_delay() -> u64 {
    12
}

fn default_request_pacing() -> u64 {
    1
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        if !config.log_dir.is_dir() {
            return Err(ConfigError::LogDir {
                path: config.log_dir.display().to_string(),
            });
        }

        Ok(config)
    }
}
