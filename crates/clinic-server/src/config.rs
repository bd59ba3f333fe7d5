//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `CLINIC_BIND_ADDR` | `0.0.0.0` |
//! | `PORT` | `5000` |
//! | `CLINIC_DATABASE_PATH` | `clinic.db` (`:memory:` for an in-memory store) |
//! | `CLINIC_DB_MAX_CONNECTIONS` | `10` |
//! | `CLINIC_DB_IDLE_TIMEOUT_SECS` | `30` |
//! | `CLINIC_DB_ACQUIRE_TIMEOUT_SECS` | `5` |
//! | `CLINIC_SESSION_TTL_SECS` | `86400` |
//! | `CLINIC_ADMIN_PASSWORD` | `pmbeki` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use clinic_core::PoolConfig;

/// Username of the account seeded at startup.
pub const ADMIN_USERNAME: &str = "admin";

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_PATH: &str = "clinic.db";
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_ADMIN_PASSWORD: &str = "pmbeki";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be an IP address, got {value:?}")]
    InvalidAddress { name: &'static str, value: String },

    #[error("{name} must be at least 1")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
    pub pool: PoolConfig,
    pub session_ttl: Duration,
    pub admin_password: String,
    /// True when `CLINIC_ADMIN_PASSWORD` was not set
    pub admin_password_is_default: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = match var("CLINIC_BIND_ADDR") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAddress {
                    name: "CLINIC_BIND_ADDR",
                    value,
                })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let defaults = PoolConfig::default();
        let max_connections: usize = number(
            &var,
            "CLINIC_DB_MAX_CONNECTIONS",
            defaults.max_connections,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::Zero {
                name: "CLINIC_DB_MAX_CONNECTIONS",
            });
        }

        let pool = PoolConfig {
            max_connections,
            idle_timeout: Duration::from_secs(number(
                &var,
                "CLINIC_DB_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
            acquire_timeout: Duration::from_secs(number(
                &var,
                "CLINIC_DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )?),
        };

        let admin_password = var("CLINIC_ADMIN_PASSWORD");

        Ok(Self {
            bind_addr,
            port: number(&var, "PORT", DEFAULT_PORT)?,
            database_path: var("CLINIC_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            pool,
            session_ttl: Duration::from_secs(number(
                &var,
                "CLINIC_SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            admin_password_is_default: admin_password.is_none(),
            admin_password: admin_password.unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn number<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinic_server=info,clinic_core=info,tower_http=warn"
}
