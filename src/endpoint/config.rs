//! Service configuration parsing (gitroute.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::endpoint::GitEndpoint;

pub const CONFIG_FILE_NAME: &str = "gitroute.toml";
pub const PORT_ENV: &str = "GITROUTE_PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid endpoint '{name}': {reason}")]
    InvalidEndpoint { name: String, reason: String },
    #[error("Duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),
}

/// Service configuration from gitroute.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub state: StateSection,
    #[serde(default)]
    pub endpoints: Vec<EndpointEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    47900
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Mirror WARN/ERROR events into daily files under the log directory
    #[serde(default = "default_true")]
    pub file: bool,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            file: true,
            retention_days: default_retention_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateSection {
    /// Registry directory; `~` expands to the home directory
    pub dir: Option<String>,
}

/// A named endpoint declared in the config file
///
/// `uri` is optional; explicit fields override whatever it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub fields: GitEndpoint,
}

impl EndpointEntry {
    pub fn to_endpoint(&self) -> Result<GitEndpoint, ConfigError> {
        let base = match self.uri.as_deref() {
            Some(uri) => GitEndpoint::parse_uri(uri).map_err(|e| ConfigError::InvalidEndpoint {
                name: self.name.clone(),
                reason: e.to_string(),
            })?,
            None => GitEndpoint::default(),
        };
        Ok(self.fields.clone().overlay(base))
    }
}

/// Base directory for everything the service keeps on disk
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(env::temp_dir)
        .join(".gitroute")
}

impl ServiceConfig {
    /// Default config location: ~/.gitroute/gitroute.toml
    pub fn default_path() -> PathBuf {
        home_dir().join(CONFIG_FILE_NAME)
    }

    /// Load config from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_port_override(env::var(PORT_ENV).ok().as_deref());
    }

    fn apply_port_override(&mut self, value: Option<&str>) {
        if let Some(port) = value.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// Directory holding endpoints.json
    pub fn state_dir(&self) -> PathBuf {
        match self.state.dir.as_deref().map(str::trim) {
            Some("~") => dirs::home_dir().unwrap_or_else(env::temp_dir),
            Some(dir) if dir.starts_with("~/") => dirs::home_dir()
                .unwrap_or_else(env::temp_dir)
                .join(&dir[2..]),
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => home_dir(),
        }
    }

    /// Resolve the configured endpoints, rejecting duplicate names
    pub fn endpoints(&self) -> Result<Vec<(String, GitEndpoint)>, ConfigError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.endpoints.len());
        for entry in &self.endpoints {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidEndpoint {
                    name: entry.name.clone(),
                    reason: "name must not be empty".to_string(),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::DuplicateEndpoint(name.to_string()));
            }
            resolved.push((name.to_string(), entry.to_endpoint()?));
        }
        Ok(resolved)
    }
}
