//! Configuration loading from a TOML file with environment variable overrides.
//!
//! Looks for `repairdesk.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use chrono::Duration;
use serde::Deserialize;

use repairdesk_domain::request::RequestWindow;

const CONFIG_FILE: &str = "repairdesk.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Notification queue settings.
    pub notifications: NotificationsConfig,
    /// Customer request limits.
    pub requests: RequestsConfig,
    /// First-run seeding.
    pub bootstrap: BootstrapConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Notifications buffered before new ones are dropped.
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RequestsConfig {
    pub customer_window_hours: u32,
    pub customer_max_requests: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Name given to the admin user created when none exists.
    pub admin_name: String,
}

impl Config {
    /// Load configuration from `repairdesk.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REPAIRDESK_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("REPAIRDESK_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("REPAIRDESK_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("REPAIRDESK_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("REPAIRDESK_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.notifications.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "notification queue capacity must be non-zero".to_string(),
            ));
        }
        if self.requests.customer_window_hours == 0 {
            return Err(ConfigError::Validation(
                "customer request window must be at least one hour".to_string(),
            ));
        }
        if self.requests.customer_max_requests == 0 {
            return Err(ConfigError::Validation(
                "customer request limit must be non-zero".to_string(),
            ));
        }
        if self.bootstrap.admin_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bootstrap admin name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Rolling limit applied to customer service requests.
    #[must_use]
    pub fn request_window(&self) -> RequestWindow {
        RequestWindow {
            window: Duration::hours(i64::from(self.requests.customer_window_hours)),
            max_requests: self.requests.customer_max_requests,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:repairdesk.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "repairdeskd=info,repairdesk=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            customer_window_hours: 24,
            customer_max_requests: 1,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_name: "admin".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
