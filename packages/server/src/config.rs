//! Server configuration from environment variables.

use curbside_database::db::{DEFAULT_POOL_SIZE, DatabaseConfig};

/// Origin prefixes allowed to call the API from a browser when
/// `CORS_ALLOWED_ORIGINS` is not set.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:8080",
    "https://fzl249020.github.io",
    "https://fzl249020.github.io/vue-fit5120-onboardingproject",
];

/// Errors from reading the configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric variable held something else.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Origin prefixes allowed for cross-origin requests.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = DatabaseConfig::default();

        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port: parse_number(&lookup, "DB_PORT")?.unwrap_or(defaults.port),
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASS"),
            name: lookup("DB_NAME").unwrap_or(defaults.name),
            pool_size: parse_number(&lookup, "DB_POOL_SIZE")?
                .unwrap_or(DEFAULT_POOL_SIZE)
                .max(1),
        };

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map_or_else(
            || {
                DEFAULT_ALLOWED_ORIGINS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            },
            |list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(ToString::to_string)
                    .collect()
            },
        );

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_number(&lookup, "PORT")?.unwrap_or(3000),
            database,
            allowed_origins,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}
