use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::StorageTag;
use crate::extensions::UniqueKey;
use crate::history::HistoryMode;
use crate::request::{Credentials, FetchOptions, Options};
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Process-wide request options; call sites and elements override them
    pub defaults: Options,
    /// Cross-origin targets interactions may request
    pub allowed_origins: Vec<String>,
    /// Network transport settings
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            user_agent: concat!("pagewire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// TOML representation of `[defaults]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlDefaults {
    pub history: Option<HistoryMode>,
    pub snippet_cache: Option<StorageTag>,
    pub abort: Option<bool>,
    pub unique: Option<UniqueKey>,
    pub credentials: Option<Credentials>,
    pub headers: Option<BTreeMap<String, String>>,
}

/// TOML representation of `[security]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlSecurity {
    pub allowed_origins: Option<Vec<String>>,
}

/// TOML representation of `[transport]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTransport {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub defaults: Option<TomlDefaults>,
    pub security: Option<TomlSecurity>,
    pub transport: Option<TomlTransport>,
}

impl Config {
    /// Load configuration from the default location, merging with defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self::from_toml_str(&contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config: TomlConfig = toml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(defaults) = toml_config.defaults {
            config.defaults = Options {
                abort: defaults.abort,
                unique: defaults.unique,
                history: defaults.history,
                snippet_cache: defaults.snippet_cache,
                fetch: FetchOptions {
                    credentials: defaults.credentials,
                    headers: defaults.headers.unwrap_or_default(),
                },
                ..Options::default()
            };
        }

        if let Some(allowed_origins) = toml_config.security.and_then(|s| s.allowed_origins) {
            config.allowed_origins = allowed_origins;
        }

        if let Some(transport) = toml_config.transport {
            if let Some(secs) = transport.timeout_secs {
                config.transport.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if let Some(user_agent) = transport.user_agent {
                config.transport.user_agent = user_agent;
            }
        }

        Ok(config)
    }
}
