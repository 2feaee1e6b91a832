//! Endpoint layer - how Git endpoints are described, configured and remembered
//!
//! This module provides:
//! - `git://` endpoint URI parsing
//! - Service configuration (gitroute.toml)
//! - The named endpoint registry and its debounced persistence

pub mod config;
pub mod endpoint;
pub mod state;
pub mod state_saver;

pub use config::{ConfigError, EndpointEntry, LoggingSection, ServiceConfig};
pub use endpoint::{EndpointError, GitEndpoint};
pub use state::{EndpointRegistry, SharedRegistry, StateError};
pub use state_saver::spawn_state_saver;
