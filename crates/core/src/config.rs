use std::env;
use std::fs;
use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::suggestions::MAX_SUGGESTIONS;

/// Default remote-delegate timeout. The source behavior had none; thirty
/// seconds keeps a stuck call from pinning the loading guard forever.
pub const DEFAULT_DELEGATE_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub delegate: DelegateConfig,
    pub suggestions: SuggestionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DelegateConfig {
    /// Base URL of the remote conversational service. `None` keeps the
    /// engine on the local echoing stub.
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct SuggestionConfig {
    pub max_suggestions: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub delegate_base_url: Option<String>,
    pub delegate_api_key: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    database: RawDatabase,
    #[serde(default)]
    delegate: RawDelegate,
    #[serde(default)]
    suggestions: RawSuggestions,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDelegate {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuggestions {
    max_suggestions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Load order: defaults, then the optional TOML file, then
    /// `WAYPOINT_*` environment variables, then explicit overrides.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str::<RawConfig>(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => RawConfig::default(),
        };

        let database_url = overrides
            .database_url
            .or_else(|| env::var("WAYPOINT_DATABASE_URL").ok())
            .or(raw.database.url)
            .unwrap_or_else(|| "sqlite://waypoint.db".to_owned());

        let delegate_base_url = overrides
            .delegate_base_url
            .or_else(|| env::var("WAYPOINT_DELEGATE_URL").ok())
            .or(raw.delegate.base_url);
        let delegate_api_key = overrides
            .delegate_api_key
            .or_else(|| env::var("WAYPOINT_DELEGATE_API_KEY").ok())
            .or(raw.delegate.api_key)
            .map(SecretString::from);
        let delegate_timeout = env_u64("WAYPOINT_DELEGATE_TIMEOUT_SECS")?
            .or(raw.delegate.timeout_secs)
            .unwrap_or(DEFAULT_DELEGATE_TIMEOUT_SECS);

        let max_suggestions =
            raw.suggestions.max_suggestions.unwrap_or(MAX_SUGGESTIONS).min(MAX_SUGGESTIONS);

        let level = overrides
            .log_level
            .or_else(|| env::var("WAYPOINT_LOG_LEVEL").ok())
            .or(raw.logging.level)
            .unwrap_or_else(|| "info".to_owned());

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections: raw.database.max_connections.unwrap_or(5),
                timeout_secs: raw.database.timeout_secs.unwrap_or(30),
            },
            delegate: DelegateConfig {
                base_url: delegate_base_url,
                api_key: delegate_api_key,
                timeout_secs: delegate_timeout,
                max_retries: raw.delegate.max_retries.unwrap_or(1),
            },
            suggestions: SuggestionConfig { max_suggestions },
            logging: LoggingConfig {
                level,
                format: raw.logging.format.unwrap_or(LogFormat::Compact),
            },
        })
    }

}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://waypoint.db".to_owned(),
                max_connections: 5,
                timeout_secs: 30,
            },
            delegate: DelegateConfig {
                base_url: None,
                api_key: None,
                timeout_secs: DEFAULT_DELEGATE_TIMEOUT_SECS,
                max_retries: 1,
            },
            suggestions: SuggestionConfig { max_suggestions: MAX_SUGGESTIONS },
            logging: LoggingConfig { level: "info".to_owned(), format: LogFormat::Compact },
        }
    }
}

fn env_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(None),
    }
}
