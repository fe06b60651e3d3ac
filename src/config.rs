// ⚙️ Runtime configuration
// Environment first, CLI flags override. No config file: everything has a default.

use crate::db::setup_database;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub const ENV_DATABASE: &str = "MORTGAGE_CALC_DB";
pub const ENV_BIND_ADDRESS: &str = "MORTGAGE_CALC_ADDR";
pub const ENV_LOG_FILTER: &str = "MORTGAGE_CALC_LOG";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_FILTER: &str = "mortgage_calc=info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// SQLite file holding saved scenarios
    pub database_path: PathBuf,

    /// Address the API server listens on
    pub bind_address: String,

    /// Fallback tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup (lets tests avoid touching the real env)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(ENV_BIND_ADDRESS).filter(|v| !v.trim().is_empty()) {
            config.bind_address = addr;
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER).filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }

        config
    }

    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database_path = path;
        }
        self
    }

    /// Open (creating if needed) the scenario database and make sure the schema exists
    pub fn open_database(&self) -> Result<Connection> {
        open_database(&self.database_path)
    }
}

pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;

    tracing::debug!(path = ?path, "database opened");
    Ok(conn)
}

/// `<data dir>/mortgage-calc/scenarios.db`, or `./scenarios.db` when no data dir is known
pub fn default_database_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("mortgage-calc").join("scenarios.db"),
        None => PathBuf::from("scenarios.db"),
    }
}
