use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::endpoint::GitEndpoint;
use crate::producer::{GitBody, GitOperation};

/// Protocol version: 1 (MessagePack binary encoding, named fields)
pub const PROTOCOL_VERSION: u32 = 1;

/// Client request, optionally wrapped with an `id` the reply echoes
///
/// `body` is flattened so a bare `ClientMessage` parses too (`id` is `None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub body: ClientMessage,
}

// ============================================================================
// Client Messages
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,

    // Endpoint registry
    ListEndpoints,
    RegisterEndpoint {
        name: String,
        endpoint: GitEndpoint,
    },
    RemoveEndpoint {
        name: String,
    },

    // Run one Git operation through an endpoint
    Exchange {
        /// Registered endpoint name or inline `git://` URI
        endpoint: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

// ============================================================================
// Server Messages
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Hello {
        version: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        capabilities: Option<Vec<String>>,
    },
    Pong,

    Endpoints {
        items: Vec<EndpointInfo>,
    },
    EndpointRegistered {
        name: String,
    },
    EndpointRemoved {
        name: String,
    },

    ExchangeResult {
        exchange_id: String,
        endpoint: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<GitOperation>,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<GitBody>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    Error {
        code: String,
        message: String,
    },
}

/// A registered endpoint as listed to clients (password never included)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub name: String,
    pub endpoint: GitEndpoint,
}

// ============================================================================
// v1 Capabilities
// ============================================================================

pub fn v1_capabilities() -> Vec<String> {
    let mut capabilities = vec![
        "endpoint_registry".to_string(),
        "inline_endpoint_uri".to_string(),
        "request_id".to_string(),
    ];
    capabilities.extend(
        GitOperation::ALL
            .iter()
            .map(|op| format!("git_{}", op.as_str())),
    );
    capabilities
}
