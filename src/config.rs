use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::gemini::DEMO_KEY;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub temperature: f32,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub max_sessions: usize,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// - `GEMINI_API_KEY`: API key (default: `DEMO_KEY`, which serves canned data)
    /// - `GEMINI_API_BASE`: API base URL
    /// - `SHOPLENS_MODEL`: model name (default: "gemini-2.5-flash")
    /// - `SHOPLENS_TEMPERATURE`: sampling temperature (default: 0.2)
    /// - `SHOPLENS_MAX_UPLOAD_BYTES`: request body limit (default: 10 MiB)
    /// - `SHOPLENS_SESSION_TTL_SECS`: idle time before a session is forgotten (default: 1800)
    /// - `SHOPLENS_MAX_SESSIONS`: sessions tracked at once (default: 10000)
    /// - `PORT`: listen port (default: 8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini = GeminiConfig {
            api_key: lookup("GEMINI_API_KEY").unwrap_or_else(|| DEMO_KEY.to_string()),
            base_url: lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: lookup("SHOPLENS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        Ok(Self {
            gemini,
            temperature: parse_or(&lookup, "SHOPLENS_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            max_upload_bytes: parse_or(&lookup, "SHOPLENS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            session_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SHOPLENS_SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            max_sessions: parse_or(&lookup, "SHOPLENS_MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.gemini.api_key, DEMO_KEY);
        assert_eq!(config.gemini.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn values_are_read_from_environment() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "abc123"),
            ("SHOPLENS_MODEL", "gemini-2.0-flash"),
            ("SHOPLENS_TEMPERATURE", "0.5"),
            ("PORT", " 3000 "),
            ("SHOPLENS_SESSION_TTL_SECS", "60"),
            ("SHOPLENS_MAX_SESSIONS", "5"),
        ])
        .unwrap();
        assert_eq!(config.gemini.api_key, "abc123");
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.max_sessions, 5);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORT: \"eighty\"");
    }
}
