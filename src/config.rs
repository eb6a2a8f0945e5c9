use std::fmt;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
/// actix-web's cookie key needs at least 64 bytes of material.
pub const MIN_SESSION_KEY_LEN: usize = 64;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "{key} has invalid value '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` only when running against the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub auth_url: String,
    pub auth_api_key: String,
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    pub memory_store: bool,
}

impl AppConfig {
    pub fn from_env(memory_store: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(memory_store, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        memory_store: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL");
        if database_url.is_none() && !memory_store {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", value: raw })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let cookie_secure = match get("COOKIE_SECURE").as_deref().map(str::trim) {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "COOKIE_SECURE", value: other.to_string() });
            }
        };

        Ok(AppConfig {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            db_max_connections,
            auth_url: get("AUTH_URL").ok_or(ConfigError::Missing("AUTH_URL"))?,
            auth_api_key: get("AUTH_API_KEY").ok_or(ConfigError::Missing("AUTH_API_KEY"))?,
            session_key: get("SESSION_KEY"),
            cookie_secure,
            memory_store,
        })
    }
}
