//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The `SameSite` attribute of the session cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

impl std::str::FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(format!("'{}' is not one of strict, lax, none", other)),
        }
    }
}

/// Attributes of the session cookie that differ between deployments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// Cross-site cookies for a deployed frontend on another origin.
    pub fn production() -> Self {
        Self {
            secure: true,
            same_site: SameSite::None,
        }
    }

    pub fn development() -> Self {
        Self {
            secure: false,
            same_site: SameSite::Strict,
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub token_secret: String,
    pub token_ttl: Duration,
    pub cookie_policy: CookiePolicy,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address: SocketAddr =
            parse_or(&lookup, "BIND_ADDRESS", Some(SocketAddr::from(([0, 0, 0, 0], 5000))))?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let database_max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", Some(5))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Session Settings ---
        let token_secret = lookup("ACCESS_TOKEN_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("ACCESS_TOKEN_SECRET".to_string()))?;
        let token_ttl_hours: u64 = parse_or(&lookup, "TOKEN_TTL_HOURS", Some(5))?;
        if token_ttl_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_HOURS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let production = lookup("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let defaults = if production {
            CookiePolicy::production()
        } else {
            CookiePolicy::development()
        };
        let cookie_policy = CookiePolicy {
            secure: parse_or(&lookup, "COOKIE_SECURE", Some(defaults.secure))?,
            same_site: parse_or(&lookup, "COOKIE_SAME_SITE", Some(defaults.same_site))?,
        };
        if cookie_policy.same_site == SameSite::None && !cookie_policy.secure {
            return Err(ConfigError::InvalidValue(
                "COOKIE_SAME_SITE".to_string(),
                "SameSite=None requires COOKIE_SECURE=true".to_string(),
            ));
        }

        // --- Load HTTP Settings ---
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();
        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", Some(30))?;

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            token_secret,
            token_ttl: Duration::from_secs(token_ttl_hours * 60 * 60),
            cookie_policy,
            cors_origins,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

/// Parses `key` when set, otherwise falls back to `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "memory://"),
        ("ACCESS_TOKEN_SECRET", "s3cret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.token_ttl, Duration::from_secs(5 * 3600));
        assert_eq!(config.cookie_policy, CookiePolicy::development());
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[rstest]
    #[case("DATABASE_URL")]
    #[case("ACCESS_TOKEN_SECRET")]
    fn missing_required_var_is_reported(#[case] missing: &str) {
        let vars: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
        match load(&vars) {
            Err(ConfigError::MissingVar(name)) => assert_eq!(name, missing),
            other => panic!("expected MissingVar, got {:?}", other),
        }
    }

    #[test]
    fn production_switches_cookie_policy() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("APP_ENV", "production"));
        assert_eq!(load(&vars).unwrap().cookie_policy, CookiePolicy::production());
    }

    #[test]
    fn cookie_overrides_win_over_environment_defaults() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("APP_ENV", "production"));
        vars.push(("COOKIE_SAME_SITE", "lax"));
        let policy = load(&vars).unwrap().cookie_policy;
        assert!(policy.secure);
        assert_eq!(policy.same_site, SameSite::Lax);
    }

    #[test]
    fn insecure_same_site_none_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("COOKIE_SAME_SITE", "none"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue(key, _)) if key == "COOKIE_SAME_SITE"));
    }

    #[rstest]
    #[case("BIND_ADDRESS", "not-an-address")]
    #[case("RUST_LOG", "chatty")]
    #[case("TOKEN_TTL_HOURS", "0")]
    #[case("REQUEST_TIMEOUT_SECS", "soon")]
    fn invalid_values_are_reported(#[case] key: &str, #[case] value: &str) {
        let mut vars = REQUIRED.to_vec();
        vars.push((key, value));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue(k, _)) if k == key));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CORS_ORIGINS", "https://a.example, https://b.example ,"));
        assert_eq!(
            load(&vars).unwrap().cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }
}
