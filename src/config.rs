use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_POOL_SIZE: &str = "5";
const DEFAULT_LOGIN_URL: &str = "/accounts/login";

#[derive(Debug, Error)]
#[error("Invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    key: &'static str,
    value: String,
    reason: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Without a database the server falls back to the in-memory store.
    pub database_url: Option<String>,
    pub bind: SocketAddr,
    pub pool_size: u32,
    pub login_url: String,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pool_size: u32 = try_load(&lookup, "POLLS_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError {
                key: "POLLS_POOL_SIZE",
                value: pool_size.to_string(),
                reason: String::from("pool needs at least one connection"),
            });
        }

        let login_url = lookup("POLLS_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
        if !login_url.starts_with('/') && !login_url.starts_with("http") {
            return Err(ConfigError {
                key: "POLLS_LOGIN_URL",
                value: login_url,
                reason: String::from("expected an absolute path or URL"),
            });
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            bind: try_load(&lookup, "POLLS_BIND", DEFAULT_BIND)?,
            pool_size,
            login_url,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError {
        key,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.login_url, "/accounts/login");
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/polls"),
            ("POLLS_BIND", "127.0.0.1:8000"),
            ("POLLS_POOL_SIZE", "12"),
            ("POLLS_LOGIN_URL", "https://auth.example.com/login"),
        ]).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/polls"));
        assert_eq!(config.bind.port(), 8000);
        assert_eq!(config.pool_size, 12);
        assert_eq!(config.login_url, "https://auth.example.com/login");
    }

    #[test]
    fn blank_database_url_means_memory() {
        assert_eq!(config(&[("DATABASE_URL", "  ")]).unwrap().database_url, None);
    }

    #[test]
    fn invalid_values() {
        let err = config(&[("POLLS_BIND", "nowhere")]).unwrap_err();
        assert!(err.to_string().starts_with("Invalid POLLS_BIND value \"nowhere\""));

        assert!(config(&[("POLLS_POOL_SIZE", "-1")]).is_err());
        assert!(config(&[("POLLS_POOL_SIZE", "0")]).is_err());
        assert!(config(&[("POLLS_LOGIN_URL", "login")]).is_err());
    }
}
