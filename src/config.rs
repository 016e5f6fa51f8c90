// src/config.rs
use crate::error::CustomError;
use dotenv::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, e.g. `http://127.0.0.1:8000`.
    pub backend_url: String,
    pub api_prefix: String,
    pub listen_addr: SocketAddr,
    /// When set, session tokens must be signed with this secret.
    pub jwt_secret: Option<String>,
    pub secure_cookies: bool,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, CustomError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CustomError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3030".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| CustomError::new(format!("Invalid LISTEN_ADDR: {}", e)))?;

        let secure_cookies = match lookup("SECURE_COOKIES").as_deref() {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(CustomError::new(format!(
                    "Invalid SECURE_COOKIES value: {}",
                    other
                )))
            }
        };

        Ok(Config {
            backend_url: lookup("BACKEND_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8000".to_string()),
            api_prefix: lookup("API_V1_PREFIX").unwrap_or_else(|| "/api/v1".to_string()),
            listen_addr,
            jwt_secret: lookup("JWT_SECRET").filter(|secret| !secret.is_empty()),
            secure_cookies,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
        })
    }

    /// Base URL of the versioned API.
    pub fn api_url(&self) -> String {
        format!(
            "{}/{}",
            self.backend_url.trim_end_matches('/'),
            self.api_prefix.trim_start_matches('/')
        )
    }

    pub fn init_logging(&self) {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        };
        Builder::new()
            .filter_level(level)
            .format_timestamp_secs()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, CustomError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_url(), "http://127.0.0.1:8000/api/v1");
        assert_eq!(config.listen_addr, "127.0.0.1:3030".parse::<SocketAddr>().unwrap());
        assert_eq!(config.jwt_secret, None);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn joins_backend_and_prefix() {
        let config = config(&[
            ("BACKEND_URL", "https://broker.example/"),
            ("API_V1_PREFIX", "/api/v2"),
        ])
        .unwrap();
        assert_eq!(config.api_url(), "https://broker.example/api/v2");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config(&[("SECURE_COOKIES", "maybe")]).is_err());
    }

    #[test]
    fn empty_secret_is_no_secret() {
        assert_eq!(config(&[("JWT_SECRET", "")]).unwrap().jwt_secret, None);
    }
}
