//! Target connection parameters and connection URL derivation.

use crate::error::ConfigError;
use crate::settings::ConnectionDefaults;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::OnceLock;
use url::Url;

/// Drivers this build can open connections for.
pub const SUPPORTED_DRIVERS: &[&str] = &["postgres", "postgresql"];

/// Characters that would split a database name out of the URL path.
const DATABASE_FORBIDDEN: &[char] = &['?', '&', '/', '#'];

fn hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("static regex"))
}

/// A DNS name or an IP literal (IPv6 without brackets).
pub fn validate_host(host: &str) -> Result<(), ConfigError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ConfigError::MissingField("host"));
    }
    if host.parse::<IpAddr>().is_ok() || hostname_re().is_match(host) {
        return Ok(());
    }
    Err(ConfigError::InvalidField("host", host.to_string()))
}

fn default_host() -> String {
    "localhost".into()
}

fn default_driver() -> String {
    "postgres".into()
}

/// Parameters describing one reachable database. Password is write-only over serde.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Falls back to [`ConnectionDefaults::default_port`] when registered without one.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub connection_url: Option<String>,
}

impl TargetConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        TargetConfig {
            host: host.into(),
            port: Some(port),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            driver: default_driver(),
            connection_url: None,
        }
    }

    pub fn with_connection_url(mut self, url: impl Into<String>) -> Self {
        self.connection_url = Some(url.into());
        self
    }

    pub fn effective_port(&self, defaults: &ConnectionDefaults) -> u16 {
        self.port.unwrap_or(defaults.default_port)
    }

    /// Name used when a target is registered without an explicit one.
    pub fn default_name(&self) -> &str {
        &self.database
    }

    /// Required fields, a well-formed host and database, and a supported driver.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_host(&self.host)?;
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField("database"));
        }
        if self.database.contains(DATABASE_FORBIDDEN) {
            return Err(ConfigError::InvalidField("database", self.database.clone()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingField("password"));
        }
        let driver = self.driver.to_ascii_lowercase();
        if !SUPPORTED_DRIVERS.contains(&driver.as_str()) {
            return Err(ConfigError::UnsupportedDriver(self.driver.clone()));
        }
        Ok(())
    }

    /// Fill in the default port and replace a missing or insecure connection URL with a derived one.
    pub fn normalized(mut self, defaults: &ConnectionDefaults) -> Result<Self, ConfigError> {
        let port = self.effective_port(defaults);
        self.port = Some(port);
        let keep = self
            .connection_url
            .as_deref()
            .map(|url| !url.trim().is_empty() && has_transport_options(url, defaults))
            .unwrap_or(false);
        if !keep {
            self.connection_url = Some(derive_connection_url(&self.host, port, &self.database, defaults)?);
        }
        Ok(self)
    }

    /// The stored URL, or the derived one when none has been set yet.
    pub fn connection_url(&self, defaults: &ConnectionDefaults) -> Result<String, ConfigError> {
        match &self.connection_url {
            Some(url) => Ok(url.clone()),
            None => derive_connection_url(&self.host, self.effective_port(defaults), &self.database, defaults),
        }
    }
}

/// `postgres://host:port/database?<transport options>`. Pure: same inputs, same string.
///
/// IPv6 hosts are bracketed and the database is percent-encoded as a single path segment,
/// so neither can add query parameters of its own.
pub fn derive_connection_url(
    host: &str,
    port: u16,
    database: &str,
    defaults: &ConnectionDefaults,
) -> Result<String, ConfigError> {
    validate_host(host)?;
    let host = host.trim();
    let authority = match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, port),
        _ => format!("{}:{}", host, port),
    };
    let mut url = Url::parse(&format!("postgres://{}", authority))
        .map_err(|e| ConfigError::InvalidField("host", format!("{}: {}", host, e)))?;
    url.path_segments_mut()
        .map_err(|_| ConfigError::InvalidField("host", host.to_string()))?
        .push(database.trim());
    if !defaults.transport_options.is_empty() {
        url.set_query(Some(&defaults.transport_options));
    }
    Ok(url.into())
}

/// Whether every mandatory transport option key appears in the URL's query string.
pub fn has_transport_options(url: &str, defaults: &ConnectionDefaults) -> bool {
    let query = match url.split_once('?') {
        Some((_, q)) => q,
        None => return defaults.option_keys().next().is_none(),
    };
    defaults.option_keys().all(|key| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(k, _)| k.trim().eq_ignore_ascii_case(key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporting() -> TargetConfig {
        TargetConfig::new("db1", 1433, "sales", "sa", "x")
    }

    #[test]
    fn derives_url_from_host_port_database() {
        let defaults = ConnectionDefaults::default();
        let cfg = reporting().normalized(&defaults).unwrap();
        assert_eq!(
            cfg.connection_url.as_deref(),
            Some("postgres://db1:1433/sales?sslmode=require")
        );
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let defaults = ConnectionDefaults::default();
        let url = derive_connection_url("::1", 5432, "sales", &defaults).unwrap();
        assert_eq!(url, "postgres://[::1]:5432/sales?sslmode=require");
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.port(), Some(5432));
        assert_eq!(parsed.query(), Some("sslmode=require"));
    }

    #[test]
    fn database_cannot_override_transport_options() {
        let defaults = ConnectionDefaults::default();
        let url = derive_connection_url("db1", 5432, "sales?sslmode=disable&x=", &defaults).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, vec![("sslmode".to_string(), "require".to_string())]);
        assert!(parsed.path().starts_with("/sales%3F"));

        let mut cfg = reporting();
        cfg.database = "sales?sslmode=disable".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidField("database", _))));
        cfg.database = "a/b".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidField("database", _))));
    }

    #[test]
    fn malformed_hosts_are_rejected() {
        let mut cfg = reporting();
        cfg.host = "db1/evil".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidField("host", _))));
        cfg.host = "user@db1".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidField("host", _))));
        cfg.host = "fe80::1".into();
        assert!(cfg.validate().is_ok());
        let defaults = ConnectionDefaults::default();
        assert!(derive_connection_url("db1?x=1", 5432, "sales", &defaults).is_err());
    }

    #[test]
    fn missing_port_takes_default() {
        let defaults = ConnectionDefaults::default();
        let mut cfg = reporting();
        cfg.port = None;
        let cfg = cfg.normalized(&defaults).unwrap();
        assert_eq!(cfg.port, Some(5432));
        assert!(cfg.connection_url.unwrap().starts_with("postgres://db1:5432/sales"));
    }

    #[test]
    fn explicit_url_with_transport_options_is_kept() {
        let defaults = ConnectionDefaults::default();
        let url = "postgres://replica:5433/sales?application_name=x&sslmode=verify-full";
        let cfg = reporting().with_connection_url(url).normalized(&defaults).unwrap();
        assert_eq!(cfg.connection_url.as_deref(), Some(url));
    }

    #[test]
    fn explicit_url_without_transport_options_is_replaced() {
        let defaults = ConnectionDefaults::default();
        let cfg = reporting()
            .with_connection_url("postgres://elsewhere:1/other")
            .normalized(&defaults)
            .unwrap();
        assert_eq!(
            cfg.connection_url.as_deref(),
            Some("postgres://db1:1433/sales?sslmode=require")
        );
    }

    #[test]
    fn validate_rejects_empty_required_fields() {
        let mut cfg = reporting();
        cfg.password.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingField("password")));

        let mut cfg = reporting();
        cfg.database = "  ".into();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingField("database")));

        let mut cfg = reporting();
        cfg.driver = "mysql".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::UnsupportedDriver(_))));
    }

    #[test]
    fn password_is_never_serialized() {
        let json = serde_json::to_value(reporting()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["database"], "sales");
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: TargetConfig =
            serde_json::from_str(r#"{"database":"sales","username":"sa","password":"x"}"#).unwrap();
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, None);
        assert_eq!(cfg.driver, "postgres");
        assert!(cfg.validate().is_ok());
    }
}
