// SPDX-License-Identifier: MIT

//! Startup configuration: CLI flags, environment variables, and an optional
//! TOML file, merged with CLI > env > file > default precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_BUS_URL: &str = "nats://127.0.0.1:4222";
const DEFAULT_HOST_ID: &str = "auto";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    FileUnreadable { path: PathBuf, source: std::io::Error },
    #[error("config file {path}: invalid TOML: {source}")]
    Invalid { path: PathBuf, source: Box<toml::de::Error> },
    #[error("scripts directory {path} does not exist or is not a directory")]
    ScriptsDirMissing { path: PathBuf },
}

/// Turns executable shell scripts into bus microservices.
#[derive(Debug, Parser)]
#[command(name = "smd")]
struct Cli {
    /// Bus connection URL.
    #[arg(long, env = "SCRIPTMESH_BUS_URL")]
    bus_url: Option<String>,
    /// Directory watched for candidate scripts.
    #[arg(long, env = "SCRIPTMESH_SCRIPTS_DIR")]
    scripts_dir: Option<PathBuf>,
    /// Host identifier used to namespace subjects, or "auto".
    #[arg(long, env = "SCRIPTMESH_HOST_ID")]
    host_id: Option<String>,
    /// Default tracing filter level.
    #[arg(long, env = "SCRIPTMESH_LOG_LEVEL")]
    log_level: Option<String>,
    /// Path to an optional TOML config file.
    #[arg(long, env = "SCRIPTMESH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bus_url: Option<String>,
    scripts_dir: Option<PathBuf>,
    host_id: Option<String>,
    log_level: Option<String>,
}

/// Fully resolved startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bus_url: String,
    pub scripts_dir: PathBuf,
    pub host_id: String,
    pub log_level: String,
    pub connect_timeout: Duration,
    pub describe_deadline: Duration,
    pub handle_deadline: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Resolve configuration from `argv` (program name first, as
    /// `std::env::args` yields), the process environment, and an optional
    /// TOML file, in CLI > env > file > default precedence.
    pub fn load(argv: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        let cli = Cli::parse_from(argv);

        let explicit_config = cli.config.is_some();
        let config_path = cli.config.clone().unwrap_or_else(default_config_path);
        let file = if explicit_config || config_path.is_file() {
            read_file_config(&config_path)?
        } else {
            FileConfig::default()
        };

        let bus_url = cli.bus_url.or(file.bus_url).unwrap_or_else(|| DEFAULT_BUS_URL.to_string());
        let scripts_dir = cli.scripts_dir.or(file.scripts_dir).unwrap_or_else(default_scripts_dir);
        let host_id = cli.host_id.or(file.host_id).unwrap_or_else(|| DEFAULT_HOST_ID.to_string());
        let log_level = cli.log_level.or(file.log_level).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        if !scripts_dir.is_dir() {
            return Err(ConfigError::ScriptsDirMissing { path: scripts_dir });
        }

        Ok(Self {
            bus_url,
            scripts_dir,
            host_id,
            log_level,
            connect_timeout: Duration::from_secs(5),
            describe_deadline: Duration::from_secs(5),
            handle_deadline: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::FileUnreadable { path: path.to_path_buf(), source })?;
    toml::from_str(&text)
        .map_err(|source| ConfigError::Invalid { path: path.to_path_buf(), source: Box::new(source) })
}

fn default_config_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("scriptmesh").join("config.toml")
}

fn default_scripts_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("scriptmesh").join("scripts")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
