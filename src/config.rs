use std::{
    env,
    fmt::{self, Display},
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use chrono::Duration;

use crate::middleware::SessionKey;

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub media_root: PathBuf,
    pub site_url: String,
}

impl Config {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::new(format!("{key} must be set")))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            session_hours: parse_or(&lookup, "SESSION_HOURS", 24)?,
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            site_url: lookup("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| String::from("http://localhost:8000")),
        })
    }

    pub fn session_key(&self) -> SessionKey {
        Arc::new(self.jwt_secret.as_bytes().to_vec())
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::hours(self.session_hours)
    }

    /// Absolute url for a site-relative path.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url, path)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(format!("{key} has an invalid value '{value}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/foodgram"), ("JWT_SECRET", "x")]).unwrap();

        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.session_hours, 24);
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.absolute_url("/s/1"), "http://localhost:8000/s/1");
    }

    #[test]
    fn required_values_must_be_present() {
        assert!(config(&[("JWT_SECRET", "x")]).is_err());
        assert!(config(&[("DATABASE_URL", "postgres://"), ("JWT_SECRET", " ")]).is_err());
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let result = config(&[
            ("DATABASE_URL", "postgres://"),
            ("JWT_SECRET", "x"),
            ("SESSION_HOURS", "soon"),
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn site_url_trailing_slash_is_dropped() {
        let config = config(&[
            ("DATABASE_URL", "postgres://"),
            ("JWT_SECRET", "x"),
            ("SITE_URL", "https://foodgram.example/"),
        ])
        .unwrap();

        assert_eq!(config.absolute_url("/recipes/1/"), "https://foodgram.example/recipes/1/");
    }
}
