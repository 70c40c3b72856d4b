use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub orchestration: OrchestrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory` for the in-process store, `sqlite:...` for SQLite
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Unset keeps attachments in memory
    pub attachment_dir: Option<String>,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    pub delete_concurrency: usize,
    pub reputation_max_attempts: u32,
    /// Zero disables the periodic orphan sweep
    pub sweep_interval_secs: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            delete_concurrency: 8,
            reputation_max_attempts: 5,
            sweep_interval_secs: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "memory".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
            },
            storage: StorageConfig {
                attachment_dir: None,
                bucket: "question-attachment".to_string(),
            },
            orchestration: OrchestrationConfig::default(),
        }
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let port = parsed_or("SERVER_PORT", defaults.server.port);

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
                public_url: env::var("PUBLIC_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            },
            storage: StorageConfig {
                attachment_dir: env::var("ATTACHMENT_DIR").ok().filter(|dir| !dir.is_empty()),
                bucket: env::var("ATTACHMENT_BUCKET").unwrap_or(defaults.storage.bucket),
            },
            orchestration: OrchestrationConfig {
                delete_concurrency: parsed_or(
                    "DELETE_CONCURRENCY",
                    defaults.orchestration.delete_concurrency,
                )
                .max(1),
                reputation_max_attempts: parsed_or(
                    "REPUTATION_MAX_ATTEMPTS",
                    defaults.orchestration.reputation_max_attempts,
                )
                .max(1),
                sweep_interval_secs: parsed_or(
                    "SWEEP_INTERVAL_SECS",
                    defaults.orchestration.sweep_interval_secs,
                ),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
