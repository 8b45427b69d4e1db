use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

pub use async_sink::SinkConfig;

#[derive(Parser)]
#[command(name = "user-service", about = "User registry service with audit and notification sinks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Запустить сервер
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Путь к TOML конфиг файлу. Без него используются значения по умолчанию.
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<String>,

    /// Порт HTTP API, перекрывает `api_port` из конфига.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Audit sink (`[AUDIT]` строки).
    #[serde(default)]
    pub audit: SinkConfig,
    /// Notification sink (`[NOTIFY]` строки).
    #[serde(default)]
    pub notify: SinkConfig,
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            audit: SinkConfig::default(),
            notify: SinkConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, crate::error::ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|detail| crate::error::ServerError::Config { context: "parse", detail: format!("'{path}': {detail}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Конфиг для `serve`: файл (если задан) плюс переопределения из CLI/env.
    pub fn resolve(args: &ServeArgs) -> Result<Self, crate::error::ServerError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(port) = args.port {
            config.api_port = port;
        }
        Ok(config)
    }
}
