//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub hub: HubConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry: i64,
}

/// Connection hub tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Outbound mailbox capacity per connection
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Broadcasts allowed to wait in the hub queue before `publish` drops
    #[serde(default = "default_broadcast_intake_capacity")]
    pub broadcast_intake_capacity: usize,
    /// Seconds without a pong before the read side gives up
    #[serde(default = "default_read_deadline_secs")]
    pub read_deadline_secs: u64,
    /// Seconds allowed for a single frame write
    #[serde(default = "default_write_deadline_secs")]
    pub write_deadline_secs: u64,
    /// Largest inbound frame accepted, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl HubConfig {
    #[must_use]
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs)
    }

    #[must_use]
    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.write_deadline_secs)
    }

    /// Keep-alive ping period, 9/10 of the read deadline so the peer's own
    /// deadline is always refreshed in time.
    #[must_use]
    pub fn ping_period(&self) -> Duration {
        self.read_deadline() * 9 / 10
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "HUB_MAILBOX_CAPACITY",
                "must be greater than zero".to_string(),
            ));
        }
        if self.broadcast_intake_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "HUB_BROADCAST_INTAKE_CAPACITY",
                "must be greater than zero".to_string(),
            ));
        }
        if self.read_deadline_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "HUB_READ_DEADLINE_SECS",
                "must be greater than zero".to_string(),
            ));
        }
        if self.write_deadline_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "HUB_WRITE_DEADLINE_SECS",
                "must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            broadcast_intake_capacity: default_broadcast_intake_capacity(),
            read_deadline_secs: default_read_deadline_secs(),
            write_deadline_secs: default_write_deadline_secs(),
            max_message_size: default_max_message_size(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "trackit".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10000
}

fn default_token_expiry() -> i64 {
    86_400 // 24 hours
}

fn default_mailbox_capacity() -> usize {
    256
}

fn default_broadcast_intake_capacity() -> usize {
    1024
}

fn default_read_deadline_secs() -> u64 {
    60
}

fn default_write_deadline_secs() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    512
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: fn() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let hub = HubConfig {
            mailbox_capacity: parse_var("HUB_MAILBOX_CAPACITY", default_mailbox_capacity)?,
            broadcast_intake_capacity: parse_var(
                "HUB_BROADCAST_INTAKE_CAPACITY",
                default_broadcast_intake_capacity,
            )?,
            read_deadline_secs: parse_var("HUB_READ_DEADLINE_SECS", default_read_deadline_secs)?,
            write_deadline_secs: parse_var(
                "HUB_WRITE_DEADLINE_SECS",
                default_write_deadline_secs,
            )?,
            max_message_size: parse_var("HUB_MAX_MESSAGE_SIZE", default_max_message_size)?,
        };
        hub.validate()?;

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("PORT", default_port)?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                token_expiry: parse_var("JWT_TOKEN_EXPIRY", default_token_expiry)?,
            },
            hub,
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }

    /// Configuration for tests and embedding: defaults everywhere, caller-supplied secret
    #[must_use]
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            jwt: JwtConfig {
                secret: secret.into(),
                token_expiry: default_token_expiry(),
            },
            hub: HubConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
