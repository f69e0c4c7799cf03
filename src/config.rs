//! Environment-driven configuration, read once at startup.

use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_SMPP_ADDR: &str = ":20001";
const DEFAULT_HTTP_ADDR: &str = ":6000";
const DEFAULT_SYSTEM_ID: &str = "smsc3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid listen address {value:?}")]
    InvalidAddr { var: &'static str, value: String },
}

/// Server configuration.
///
/// | Variable          | Default    |
/// |-------------------|------------|
/// | `SMSC3_SMPP_ADDR` | `:20001`   |
/// | `SMSC3_HTTP_ADDR` | `:6000`    |
/// | `SMSC3_SYSTEM_ID` | `smsc3`    |
/// | `SMSC3_USERNAME`  | empty (any)|
/// | `SMSC3_PASSWORD`  | empty (any)|
///
/// Empty username/password mean the corresponding credential is not
/// checked during bind.
#[derive(Clone, Debug)]
pub struct Config {
    pub smpp_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub system_id: String,
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smpp_addr: listen_addr("SMSC3_SMPP_ADDR", DEFAULT_SMPP_ADDR)?,
            http_addr: listen_addr("SMSC3_HTTP_ADDR", DEFAULT_HTTP_ADDR)?,
            system_id: env_or("SMSC3_SYSTEM_ID", DEFAULT_SYSTEM_ID),
            username: env_or("SMSC3_USERNAME", ""),
            password: env_or("SMSC3_PASSWORD", ""),
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_owned(),
    }
}

fn listen_addr(var: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let value = env_or(var, default);
    parse_listen_addr(&value).ok_or(ConfigError::InvalidAddr { var, value })
}

/// Parses a listen address, accepting the bare `:port` shorthand as
/// "every interface on that port".
fn parse_listen_addr(value: &str) -> Option<SocketAddr> {
    if let Some(port) = value.strip_prefix(':') {
        let port: u16 = port.parse().ok()?;
        return Some(SocketAddr::from(([0, 0, 0, 0], port)));
    }
    value.parse().ok()
}
