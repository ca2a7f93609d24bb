use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::campaign::DEFAULT_SETTLEMENT_INTERVAL;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// When unset the in-process accumulator is used.
    pub redis_url: Option<String>,
    pub redis_prefix: String,
    pub settlement_interval: Duration,
    pub swap_channel_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let redis_url = env_map
            .get("REDIS_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let redis_prefix = env_map.get("REDIS_PREFIX").cloned().unwrap_or_default();

        let settlement_interval = match env_map.get("SETTLEMENT_INTERVAL_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SETTLEMENT_INTERVAL_SECS".to_string(),
                        "must be a positive integer".to_string(),
                    )
                })?;
                // A shorter interval would settle a period while swaps still land in it
                if secs < DEFAULT_SETTLEMENT_INTERVAL.as_secs() {
                    return Err(ConfigError::InvalidValue(
                        "SETTLEMENT_INTERVAL_SECS".to_string(),
                        format!(
                            "must be at least {} (one share pool period)",
                            DEFAULT_SETTLEMENT_INTERVAL.as_secs()
                        ),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_SETTLEMENT_INTERVAL,
        };

        let swap_channel_capacity = env_map
            .get("SWAP_CHANNEL_CAPACITY")
            .map(|s| s.as_str())
            .unwrap_or("1024")
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SWAP_CHANNEL_CAPACITY".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            redis_url,
            redis_prefix,
            settlement_interval,
            swap_channel_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.redis_prefix, "");
        assert_eq!(config.settlement_interval, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.swap_channel_capacity, 1024);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_redis_settings() {
        let mut env_map = setup_required_env();
        env_map.insert("REDIS_URL".to_string(), "redis://127.0.0.1:6379/0".to_string());
        env_map.insert("REDIS_PREFIX".to_string(), "campaign:".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379/0"));
        assert_eq!(config.redis_prefix, "campaign:");
    }

    #[test]
    fn test_blank_redis_url_means_in_memory() {
        let mut env_map = setup_required_env();
        env_map.insert("REDIS_URL".to_string(), "  ".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_invalid_settlement_interval() {
        for bad in ["0", "-5", "weekly"] {
            let mut env_map = setup_required_env();
            env_map.insert("SETTLEMENT_INTERVAL_SECS".to_string(), bad.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SETTLEMENT_INTERVAL_SECS"),
                _ => panic!("Expected InvalidValue error for {}", bad),
            }
        }
    }

    #[test]
    fn test_settlement_interval_covers_a_period() {
        for short in ["60", "604799"] {
            let mut env_map = setup_required_env();
            env_map.insert("SETTLEMENT_INTERVAL_SECS".to_string(), short.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, msg)) => {
                    assert_eq!(k, "SETTLEMENT_INTERVAL_SECS");
                    assert!(msg.contains("604800"), "{}", msg);
                }
                _ => panic!("Expected InvalidValue error for {}", short),
            }
        }

        let mut env_map = setup_required_env();
        env_map.insert("SETTLEMENT_INTERVAL_SECS".to_string(), "1209600".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.settlement_interval, Duration::from_secs(14 * 24 * 60 * 60));
    }

    #[test]
    fn test_invalid_swap_channel_capacity() {
        let mut env_map = setup_required_env();
        env_map.insert("SWAP_CHANNEL_CAPACITY".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SWAP_CHANNEL_CAPACITY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
