use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "OSGB";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Ten years; longer lifetimes overflow timestamp arithmetic long before they are useful.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot determine home directory; set OSGB_DB_PATH")]
    NoHomeDir,
}

/// What deleting a protocol does to the rows that reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolDeletePolicy {
    /// Refuse while payments, services or lab data still point at the protocol.
    Restrict,
    /// Remove lab results, submissions, service lines and payments first.
    Cascade,
}

impl FromStr for ProtocolDeletePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restrict" => Ok(Self::Restrict),
            "cascade" => Ok(Self::Cascade),
            _ => Err(ConfigError::InvalidValue {
                key: "OSGB_PROTOCOL_DELETE_POLICY",
                value: s.into(),
            }),
        }
    }
}

/// Runtime configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub token_ttl_hours: i64,
    pub protocol_delete_policy: ProtocolDeletePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes
    /// `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("OSGB_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "OSGB_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let db_path = match lookup("OSGB_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_db_path()?,
        };

        let token_ttl_hours = match lookup("OSGB_TOKEN_TTL_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OSGB_TOKEN_TTL_HOURS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let protocol_delete_policy = match lookup("OSGB_PROTOCOL_DELETE_POLICY") {
            Some(raw) => raw.parse()?,
            None => ProtocolDeletePolicy::Restrict,
        };

        Ok(Self {
            bind_addr,
            db_path,
            token_ttl_hours,
            protocol_delete_policy,
        })
    }

    /// Config pointing at an explicit database file, defaults elsewhere.
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_path,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            protocol_delete_policy: ProtocolDeletePolicy::Restrict,
        }
    }
}

/// Get the application data directory (~/.osgb/)
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".osgb"))
        .ok_or(ConfigError::NoHomeDir)
}

fn default_db_path() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("osgb.db"))
}

/// Log filter used when neither `OSGB_LOG` nor `RUST_LOG` is set.
pub fn default_log_filter() -> &'static str {
    "info,osgb_lib=debug"
}
