//! 共享上下文与错误类型
//!
//! 提供统一的 endpoint 解析、错误处理和 handler 上下文。

use thiserror::Error;
use tokio::sync::mpsc;

use crate::endpoint::endpoint::URI_SCHEME;
use crate::endpoint::{EndpointError, GitEndpoint, SharedRegistry};
use crate::server::protocol::ServerMessage;

/// Handler 上下文：收拢所有 handler 共享依赖
#[derive(Clone)]
pub struct HandlerContext {
    pub registry: SharedRegistry,
    pub save_tx: mpsc::Sender<()>,
}

/// 统一应用错误类型，由调度层转换为 `ServerMessage::Error`
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Endpoint '{0}' not found")]
    EndpointNotFound(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 转换为协议 error code
    pub fn code(&self) -> &str {
        match self {
            AppError::EndpointNotFound(_) => "endpoint_not_found",
            AppError::InvalidEndpoint(_) => "invalid_endpoint",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// 转换为 ServerMessage::Error
    pub fn to_server_error(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<EndpointError> for AppError {
    fn from(e: EndpointError) -> Self {
        AppError::InvalidEndpoint(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task failed: {}", e))
    }
}

/// Whether an endpoint reference is an inline `git://` URI rather than a name
pub fn is_inline_uri(reference: &str) -> bool {
    reference.trim_start().starts_with(URI_SCHEME)
}

/// Resolve a registered endpoint name or an inline `git://` URI
pub async fn resolve_endpoint(
    registry: &SharedRegistry,
    reference: &str,
) -> Result<GitEndpoint, AppError> {
    if is_inline_uri(reference) {
        return Ok(GitEndpoint::parse_uri(reference)?);
    }

    let registry = registry.read().await;
    registry
        .get(reference.trim())
        .cloned()
        .ok_or_else(|| AppError::EndpointNotFound(reference.to_string()))
}
