//! Configuration management with file and environment variable layers.

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served for unmatched GET paths (demo UI)
    pub static_dir: Option<PathBuf>,
    pub enable_cors: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: None,
            enable_cors: true,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Remote source and schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    pub source_url: String,
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            source_url: "https://jsonplaceholder.typicode.com/photos".to_string(),
            interval_seconds: 60,
            timeout_seconds: 30,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main settings structure with all configuration sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub refresh: RefreshSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from the embedded defaults, an optional config file and
    /// `PHOTO_FEED__*` environment variables, in that order of precedence.
    ///
    /// The result is not validated; callers apply their own overrides first
    /// and then call [`Settings::validate`].
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::from_str(include_str!("../config.toml"), FileFormat::Toml));

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("photo_feed").required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("PHOTO_FEED")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Honour the conventional `PORT` variable used by hosting platforms.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }
        Ok(())
    }

    /// Validate settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port cannot be 0"));
        }
        if self.refresh.interval_seconds == 0 {
            return Err(anyhow!("Refresh interval must be at least one second"));
        }
        if self.refresh.max_attempts == 0 {
            return Err(anyhow!("Refresh max_attempts must be at least 1"));
        }
        if self.refresh.source_url.trim().is_empty() {
            return Err(anyhow!("Refresh source_url cannot be empty"));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(anyhow!("Unknown logging format: {}", self.logging.format));
        }

        if let Some(dir) = &self.server.static_dir {
            if !dir.is_dir() {
                warn!("Static directory does not exist: {:?}", dir);
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
