//! Server configuration from environment variables
//!
//! - CADASTRE_HOST: Bind address (default: 0.0.0.0)
//! - CADASTRE_PORT: Port number (default: 8080)
//! - CADASTRE_DATA_FILE: Local semicolon-delimited dataset
//! - CADASTRE_YANDEX_KEY: Public Yandex Disk share id or URL, used when no
//!   data file is given (default: DB_EoNBlaIoLMg)
//! - CADASTRE_USERS_PATH: Credential table (default: users.csv)
//! - CADASTRE_LOG_PATH: Query log (default: requests_log.csv)
//! - CADASTRE_PENDING_PATH: Access requests (default: pending_requests.csv)
//! - CADASTRE_CACHE_TTL_SECS: Dataset cache lifetime, 0 = process lifetime (default: 3600)
//! - CADASTRE_COLUMN_MAP: JSON file with extra column renames
//! - CADASTRE_MAX_ADDRESS_MATCHES: Address search limit (default: 50)
//! - CADASTRE_SESSION_TTL_SECS: Session lifetime (default: 43200)

use std::path::PathBuf;
use std::time::Duration;

use crate::data::DatasetSource;
use crate::query::DEFAULT_MATCH_LIMIT;

pub const DEFAULT_YANDEX_KEY: &str = "DB_EoNBlaIoLMg";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_source: DatasetSource,
    pub users_path: PathBuf,
    pub log_path: PathBuf,
    pub pending_path: PathBuf,
    /// None keeps the dataset for the process lifetime
    pub cache_ttl: Option<Duration>,
    pub column_map: Option<PathBuf>,
    pub max_address_matches: usize,
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_source: DatasetSource::YandexDisk {
                public_key: DEFAULT_YANDEX_KEY.to_string(),
            },
            users_path: PathBuf::from("users.csv"),
            log_path: PathBuf::from("requests_log.csv"),
            pending_path: PathBuf::from("pending_requests.csv"),
            cache_ttl: Some(Duration::from_secs(3600)), // 1 hour
            column_map: None,
            max_address_matches: DEFAULT_MATCH_LIMIT,
            session_ttl: Duration::from_secs(12 * 3600),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_source = match (get("CADASTRE_DATA_FILE"), get("CADASTRE_YANDEX_KEY")) {
            (Some(path), _) => DatasetSource::LocalFile(PathBuf::from(path)),
            (None, Some(key)) => DatasetSource::YandexDisk { public_key: key },
            (None, None) => defaults.data_source,
        };

        let cache_ttl = match parse_number::<u64>(&get, "CADASTRE_CACHE_TTL_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.cache_ttl,
        };

        Ok(Self {
            host: get("CADASTRE_HOST").unwrap_or(defaults.host),
            port: parse_number(&get, "CADASTRE_PORT")?.unwrap_or(defaults.port),
            data_source,
            users_path: get("CADASTRE_USERS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.users_path),
            log_path: get("CADASTRE_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_path),
            pending_path: get("CADASTRE_PENDING_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.pending_path),
            cache_ttl,
            column_map: get("CADASTRE_COLUMN_MAP").map(PathBuf::from),
            max_address_matches: parse_number(&get, "CADASTRE_MAX_ADDRESS_MATCHES")?
                .unwrap_or(defaults.max_address_matches),
            session_ttl: parse_number::<u64>(&get, "CADASTRE_SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}
