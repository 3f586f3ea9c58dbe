//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::physics::Tuning;
use crate::game::MatchSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed overlay origins for CORS, empty means any
    pub client_origins: Vec<String>,

    pub min_players: usize,
    pub max_players: usize,
    pub match_duration_secs: u64,
    pub cleanup_delay_secs: u64,
    /// Match-control commands need moderator rights
    pub restrict_control: bool,
    /// Seed for colour assignment
    pub match_seed: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty() && *s != "*")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origins,
            min_players: parse_or(&lookup, "MIN_PLAYERS", 2)?,
            max_players: parse_or(&lookup, "MAX_PLAYERS", 20)?,
            match_duration_secs: parse_or(&lookup, "MATCH_DURATION_SECS", 120)?,
            cleanup_delay_secs: parse_or(&lookup, "CLEANUP_DELAY_SECS", 10)?,
            restrict_control: parse_or(&lookup, "RESTRICT_CONTROL", true)?,
            match_seed: match lookup("MATCH_SEED") {
                Some(_) => parse_or(&lookup, "MATCH_SEED", 0)?,
                None => rand::random(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players == 0 {
            return Err(ConfigError::Invalid("MIN_PLAYERS"));
        }
        if self.max_players < self.min_players {
            return Err(ConfigError::Invalid("MAX_PLAYERS"));
        }
        if self.match_duration_secs == 0 {
            return Err(ConfigError::Invalid("MATCH_DURATION_SECS"));
        }
        Ok(())
    }

    /// Match settings derived from this configuration
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            min_players: self.min_players,
            max_players: self.max_players,
            duration_ms: self.match_duration_secs * 1000,
            cleanup_delay_ms: self.cleanup_delay_secs * 1000,
            seed: self.match_seed,
            tuning: Tuning::default(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.log_level, "info");
        assert!(config.client_origins.is_empty());
        assert_eq!((config.min_players, config.max_players), (2, 20));
        assert!(config.restrict_control);

        let settings = config.match_settings();
        assert_eq!(settings.duration_ms, 120_000);
        assert_eq!(settings.cleanup_delay_ms, 10_000);
    }

    #[test]
    fn port_takes_precedence_over_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn origins_are_split_and_wildcard_dropped() {
        let config = load(&[("CLIENT_ORIGIN", "http://a.test, http://b.test,*")]).unwrap();
        assert_eq!(config.client_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("MIN_PLAYERS", "1"),
            ("MAX_PLAYERS", "4"),
            ("MATCH_DURATION_SECS", "30"),
            ("RESTRICT_CONTROL", "false"),
            ("MATCH_SEED", "42"),
        ])
        .unwrap();
        assert!(!config.restrict_control);
        let settings = config.match_settings();
        assert_eq!(settings.max_players, 4);
        assert_eq!(settings.duration_ms, 30_000);
        assert_eq!(settings.seed, 42);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        assert!(matches!(
            load(&[("MAX_PLAYERS", "many")]),
            Err(ConfigError::Invalid("MAX_PLAYERS"))
        ));
        assert!(matches!(
            load(&[("MIN_PLAYERS", "5"), ("MAX_PLAYERS", "3")]),
            Err(ConfigError::Invalid("MAX_PLAYERS"))
        ));
        assert!(matches!(
            load(&[("MIN_PLAYERS", "0")]),
            Err(ConfigError::Invalid("MIN_PLAYERS"))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
