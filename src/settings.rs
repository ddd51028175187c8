//! Process-wide settings read from the environment (`.env` honored via dotenvy).

use crate::error::ConfigError;
use std::net::SocketAddr;

/// Default PostgreSQL port used when a target omits one.
pub const DEFAULT_PORT: u16 = 5432;

/// Transport options appended to every derived connection URL.
pub const DEFAULT_TRANSPORT_OPTIONS: &str = "sslmode=require";

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Connection-string inputs shared by every target: default port and fixed transport options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionDefaults {
    pub default_port: u16,
    /// `key=value` pairs joined by `&`, e.g. `sslmode=require`.
    pub transport_options: String,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        ConnectionDefaults {
            default_port: DEFAULT_PORT,
            transport_options: DEFAULT_TRANSPORT_OPTIONS.to_string(),
        }
    }
}

impl ConnectionDefaults {
    /// Keys of the transport options (`sslmode` for `sslmode=require`).
    pub fn option_keys(&self) -> impl Iterator<Item = &str> {
        self.transport_options
            .split('&')
            .filter_map(|pair| pair.split('=').next())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub bind: SocketAddr,
    pub body_limit: usize,
    pub connection: ConnectionDefaults,
}

impl Settings {
    /// Load `.env` (if present) into the process environment, then read settings from it.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read `SWITCHBOARD_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("SWITCHBOARD_BIND").unwrap_or_else(|| DEFAULT_BIND.into());
        let bind: SocketAddr = bind
            .parse()
            .map_err(|e| ConfigError::Load(format!("SWITCHBOARD_BIND '{}': {}", bind, e)))?;

        let default_port = match lookup("SWITCHBOARD_DEFAULT_PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Load(format!("SWITCHBOARD_DEFAULT_PORT '{}': {}", v, e)))?,
            None => DEFAULT_PORT,
        };

        let transport_options = lookup("SWITCHBOARD_TRANSPORT_OPTIONS")
            .map(|s| s.trim().trim_start_matches('?').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TRANSPORT_OPTIONS.into());

        let body_limit = match lookup("SWITCHBOARD_BODY_LIMIT") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::Load(format!("SWITCHBOARD_BODY_LIMIT '{}': {}", v, e)))?,
            None => DEFAULT_BODY_LIMIT,
        };

        Ok(Settings {
            bind,
            body_limit,
            connection: ConnectionDefaults {
                default_port,
                transport_options,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(s.bind.port(), 8080);
        assert_eq!(s.connection, ConnectionDefaults::default());
        assert_eq!(s.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn overrides_and_strips_leading_question_mark() {
        let s = Settings::from_lookup(lookup_from(&[
            ("SWITCHBOARD_BIND", "127.0.0.1:9000"),
            ("SWITCHBOARD_DEFAULT_PORT", "6543"),
            ("SWITCHBOARD_TRANSPORT_OPTIONS", "?sslmode=disable&application_name=switchboard"),
        ]))
        .unwrap();
        assert_eq!(s.bind.port(), 9000);
        assert_eq!(s.connection.default_port, 6543);
        assert_eq!(
            s.connection.option_keys().collect::<Vec<_>>(),
            vec!["sslmode", "application_name"]
        );
    }

    #[test]
    fn bad_port_is_a_load_error() {
        let err = Settings::from_lookup(lookup_from(&[("SWITCHBOARD_DEFAULT_PORT", "huge")])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
