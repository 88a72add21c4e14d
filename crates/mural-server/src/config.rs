//! Environment-driven server configuration.

use mural_core::EngineConfig;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3030";
pub const DEFAULT_ROOM: &str = "lobby";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MURAL_BIND_ADDR {value:?} is not a socket address: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("{key} {value:?} is not a number")]
    Number { key: &'static str, value: String },
    #[error("scale range {min}..={max} is empty or not positive")]
    ScaleRange { min: f64, max: f64 },
    #[error("MURAL_DEFAULT_ROOM must not be empty")]
    EmptyRoom,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Room used when a client does not name one.
    pub default_room: String,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            default_room: DEFAULT_ROOM.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `MURAL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let addr = lookup("MURAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = addr
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: addr.clone(), source })?;

        let default_room = lookup("MURAL_DEFAULT_ROOM").unwrap_or_else(|| DEFAULT_ROOM.to_string());
        if default_room.trim().is_empty() {
            return Err(ConfigError::EmptyRoom);
        }

        let min_scale = parse_number(&lookup, "MURAL_MIN_SCALE", defaults.min_scale)?;
        let max_scale = parse_number(&lookup, "MURAL_MAX_SCALE", defaults.max_scale)?;
        if !(min_scale > 0.0 && min_scale <= max_scale && max_scale.is_finite()) {
            return Err(ConfigError::ScaleRange {
                min: min_scale,
                max: max_scale,
            });
        }

        Ok(Self {
            bind_addr,
            default_room,
            engine: EngineConfig { min_scale, max_scale },
        })
    }
}

fn parse_number<F>(lookup: &F, key: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Number { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 3030);
        assert_eq!(config.default_room, "lobby");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("MURAL_BIND_ADDR", "127.0.0.1:9000"),
            ("MURAL_DEFAULT_ROOM", "wall"),
            ("MURAL_MIN_SCALE", "0.25"),
            ("MURAL_MAX_SCALE", " 4 "),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.default_room, "wall");
        assert_eq!(config.engine.min_scale, 0.25);
        assert_eq!(config.engine.max_scale, 4.0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("MURAL_BIND_ADDR", "nowhere")])),
            Err(ConfigError::BindAddr { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("MURAL_MIN_SCALE", "tiny")])),
            Err(ConfigError::Number { key: "MURAL_MIN_SCALE", .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[
                ("MURAL_MIN_SCALE", "5"),
                ("MURAL_MAX_SCALE", "2"),
            ])),
            Err(ConfigError::ScaleRange { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("MURAL_DEFAULT_ROOM", " ")])),
            Err(ConfigError::EmptyRoom)
        ));
    }
}
