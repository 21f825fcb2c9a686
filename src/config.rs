//! Connection configuration and the `.ssh-portal` key=value config file.
//!
//! Settings resolve in two layers: the optional config file provides
//! defaults, command-line flags override them. Validation happens once,
//! before any connection attempt.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::warn;
use secrecy::SecretString;

use crate::error::{Error, Result};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// A value parsed from the config file. Boolean-looking and
/// integer-looking strings are coerced; everything else stays a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConfigValue {
    fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower == "true" {
            ConfigValue::Bool(true)
        } else if lower == "false" {
            ConfigValue::Bool(false)
        } else if let Ok(n) = raw.parse::<i64>() {
            ConfigValue::Int(n)
        } else {
            ConfigValue::Str(raw.to_string())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Parsed contents of a config file.
pub type ConfigMap = HashMap<String, ConfigValue>;

/// Load a key=value config file.
///
/// Missing file yields an empty map. An unreadable file is a warning, not
/// an error - the session proceeds on CLI flags alone. Lines starting with
/// `#` are comments; values may contain `=`.
pub fn load(path: &Path) -> ConfigMap {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ConfigMap::new(),
        Err(e) => {
            warn!("Could not load config file {}: {}", path.display(), e);
            return ConfigMap::new();
        }
    };

    let mut map = ConfigMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                map.insert(key.to_string(), ConfigValue::parse(value.trim()));
            }
        }
    }
    map
}

/// Write a commented configuration template to `path`.
pub fn write_template(path: &Path) -> std::io::Result<()> {
    let template = "# SSH Portal Configuration File\n\
                    host=example.com\n\
                    port=22\n\
                    user=username\n\
                    password=password\n\
                    accept_unknown_cert=true\n";
    std::fs::write(path, template)
}

/// Immutable connection parameters for one session.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Username for password authentication.
    pub user: String,

    /// Password, kept out of Debug output and logs.
    pub password: SecretString,

    /// Accept a server key that is not already known.
    pub accept_unknown_cert: bool,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

impl ConnectionConfig {
    /// Merge CLI overrides with config-file values and validate.
    ///
    /// Fails with [`Error::Validation`] naming every missing or unusable
    /// required field (host, user, password, a zero port). No connection
    /// is attempted here.
    pub fn resolve(overrides: ConnectionOverrides, file: &ConfigMap) -> Result<Self> {
        let file_str = |key: &str| file.get(key).and_then(ConfigValue::as_str).map(String::from);

        let host = overrides.host.or_else(|| file_str("host"));
        let user = overrides.user.or_else(|| file_str("user"));
        let password = overrides.password.or_else(|| file_str("password"));

        let port = overrides
            .port
            .or_else(|| {
                file.get("port")
                    .and_then(ConfigValue::as_int)
                    .and_then(|n| u16::try_from(n).ok())
            })
            .unwrap_or(DEFAULT_PORT);

        let accept_unknown_cert = file
            .get("accept_unknown_cert")
            .and_then(ConfigValue::as_bool)
            .unwrap_or(true);

        let mut missing = Vec::new();
        if host.is_none() {
            missing.push("host");
        }
        if user.is_none() {
            missing.push("user");
        }
        if password.is_none() {
            missing.push("password");
        }
        // Port 0 is not a connectable port.
        if port == 0 {
            missing.push("port");
        }
        if !missing.is_empty() {
            return Err(Error::Validation {
                missing: missing.join(", "),
            });
        }

        // The is_none checks above guarantee these unwraps.
        Ok(Self {
            host: host.unwrap(),
            port,
            user: user.unwrap(),
            password: SecretString::from(password.unwrap()),
            accept_unknown_cert,
        })
    }
}
