//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `MONETA__*` environment variables
//! (`MONETA__SERVER__PORT=8080` overrides `server.port`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: 3000,
            database: Database::Sqlite("moneta.db".to_string()),
        }
    }
}

impl Server {
    pub fn addr(&self) -> String {
        format!(
            "{}:{}",
            self.bind.as_deref().unwrap_or("127.0.0.1"),
            self.port
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Auth {
    pub password_iterations: u32,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            password_iterations: engine::DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    pub enabled: bool,
    pub tick_secs: u64,
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_delay_secs: i64,
    /// A claimed job still `active` after this long is taken over by
    /// another worker.
    pub lease_secs: i64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: 60,
            workers: 2,
            max_attempts: 3,
            retry_delay_secs: 30,
            lease_secs: engine::DEFAULT_JOB_LEASE_SECS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub auth: Auth,
    pub scheduler: Scheduler,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("MONETA")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
