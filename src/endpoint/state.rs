//! Endpoint registry persistence (endpoints.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::endpoint::GitEndpoint;

pub const STATE_FILE_NAME: &str = "endpoints.json";

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read state: {0}")]
    ReadError(String),
    #[error("Failed to write state: {0}")]
    WriteError(String),
    #[error("Failed to parse state: {0}")]
    ParseError(String),
}

pub type SharedRegistry = Arc<RwLock<EndpointRegistry>>;

/// Named endpoints - persisted to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRegistry {
    pub version: u32,
    #[serde(default)]
    pub endpoints: BTreeMap<String, GitEndpoint>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self {
            version: 1,
            endpoints: BTreeMap::new(),
            last_updated: Some(Utc::now()),
        }
    }
}

impl EndpointRegistry {
    /// Registry file inside `state_dir`
    pub fn state_path(state_dir: &Path) -> PathBuf {
        state_dir.join(STATE_FILE_NAME)
    }

    /// Load registry from disk; a missing file yields an empty registry
    pub fn load_from(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| StateError::ReadError(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| StateError::ParseError(e.to_string()))
    }

    /// Save registry to disk
    pub fn save_to(&mut self, path: &Path) -> Result<(), StateError> {
        self.last_updated = Some(Utc::now());
        self.write_to(path)
    }

    /// Write the registry as-is, keeping `last_updated` untouched
    pub fn write_to(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::WriteError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| StateError::WriteError(e.to_string()))?;

        fs::write(path, content).map_err(|e| StateError::WriteError(e.to_string()))
    }

    /// Add or replace an endpoint, returning the previous one
    pub fn register(&mut self, name: &str, endpoint: GitEndpoint) -> Option<GitEndpoint> {
        self.endpoints.insert(name.to_string(), endpoint)
    }

    pub fn get(&self, name: &str) -> Option<&GitEndpoint> {
        self.endpoints.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<GitEndpoint> {
        self.endpoints.remove(name)
    }

    /// All endpoints, sorted by name
    pub fn list(&self) -> Vec<(&str, &GitEndpoint)> {
        self.endpoints
            .iter()
            .map(|(name, endpoint)| (name.as_str(), endpoint))
            .collect()
    }

    /// Overlay endpoints declared in the config file; config entries win
    pub fn merge_configured(&mut self, configured: Vec<(String, GitEndpoint)>) {
        for (name, endpoint) in configured {
            self.endpoints.insert(name, endpoint);
        }
    }
}
