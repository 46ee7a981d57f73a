//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `QUEUELINE_*` environment variables.

use anyhow::{Context, Result};
use queueline_core::application::WriteMode;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const ENV_PREFIX: &str = "QUEUELINE";
const DEFAULT_CONFIG_FILE: &str = "queueline.toml";
const DEFAULT_DB_PATH: &str = "~/.queueline/queueline.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub database_url: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub location_id: String,
    pub region: String,
    pub write_mode: WriteMode,
    pub log_format: LogFormat,
    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl DaemonConfig {
    /// Load from `QUEUELINE_CONFIG` (or ./queueline.toml) and the process environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(format!("{}_CONFIG", ENV_PREFIX))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(Some(Path::new(&file)), None)
    }

    /// `env` replaces the process environment when given
    pub fn from_sources(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("database_url", DEFAULT_DB_PATH)?
            .set_default("rpc_host", queueline_api_rpc::server::DEFAULT_RPC_HOST)?
            .set_default("rpc_port", queueline_api_rpc::server::DEFAULT_RPC_PORT as i64)?
            .set_default("location_id", "default")?
            .set_default("region", "main")?
            .set_default("write_mode", "overwrite")?
            .set_default("log_format", "pretty")?;

        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(false));
        }

        let mut config: DaemonConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.database_url = expand_database_url(&config.database_url)?;
        config.log_dir = config.log_dir.map(|d| shellexpand::tilde(&d).into_owned());
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.location_id.trim().is_empty() {
            anyhow::bail!("location_id must not be empty");
        }
        if self.region.trim().is_empty() {
            anyhow::bail!("region must not be empty");
        }
        Ok(())
    }
}

/// Expand `~` and turn a bare path into a sqlite URL
fn expand_database_url(raw: &str) -> Result<String> {
    if raw.starts_with("sqlite:") {
        return Ok(raw.to_string());
    }
    let path = shellexpand::tilde(raw).into_owned();
    if let Some(parent) = Path::new(&path).parent() {
        // The pool creates the file but not its directory
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create database directory {}", parent.display()))?;
    }
    Ok(format!("sqlite://{}", path))
}
