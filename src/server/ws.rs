use anyhow::Context;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace, warn};

use crate::endpoint::{spawn_state_saver, EndpointRegistry, ServiceConfig, SharedRegistry};
use crate::server::context::HandlerContext;
use crate::server::handlers;
use crate::server::protocol::{
    v1_capabilities, ClientMessage, RequestEnvelope, ServerMessage, PROTOCOL_VERSION,
};

/// WebSocket 服务器上下文，包含共享注册表和防抖保存通道
#[derive(Clone)]
pub struct AppContext {
    pub registry: SharedRegistry,
    pub save_tx: tokio::sync::mpsc::Sender<()>,
}

impl AppContext {
    /// Wrap `registry` and start its debounced saver writing to `state_path`
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(registry: EndpointRegistry, state_path: PathBuf) -> Self {
        let registry: SharedRegistry = Arc::new(RwLock::new(registry));
        let save_tx = spawn_state_saver(registry.clone(), state_path);
        Self { registry, save_tx }
    }
}

/// Load the persisted registry and overlay the endpoints from `config`
pub fn load_registry(config: &ServiceConfig) -> anyhow::Result<(EndpointRegistry, PathBuf)> {
    let state_path = EndpointRegistry::state_path(&config.state_dir());
    let mut registry = match EndpointRegistry::load_from(&state_path) {
        Ok(registry) => registry,
        Err(e) => {
            warn!(
                "Ignoring unreadable endpoint registry {}: {}",
                state_path.display(),
                e
            );
            EndpointRegistry::default()
        }
    };

    let configured = config
        .endpoints()
        .context("invalid endpoint in configuration")?;
    if !configured.is_empty() {
        info!("Loaded {} endpoint(s) from configuration", configured.len());
    }
    registry.merge_configured(configured);

    Ok((registry, state_path))
}

/// Run the WebSocket server on the configured address
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let (registry, state_path) = load_registry(&config)?;
    info!(
        "Endpoint registry: {} endpoint(s), persisted at {}",
        registry.endpoints.len(),
        state_path.display()
    );

    let ctx = AppContext::new(registry, state_path);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(
        "Listening on ws://{}/ws (protocol v{})",
        addr, PROTOCOL_VERSION
    );

    serve(listener, ctx).await
}

pub fn router(ctx: AppContext) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(ctx)
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, ctx: AppContext) -> anyhow::Result<()> {
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

/// Handle a WebSocket connection
///
/// Messages are handled one at a time; the Git work of an exchange runs on
/// the blocking pool while this task awaits it.
async fn handle_socket(mut socket: WebSocket, ctx: AppContext) {
    info!("New WebSocket connection established");

    let handler_ctx = HandlerContext {
        registry: ctx.registry.clone(),
        save_tx: ctx.save_tx.clone(),
    };

    let hello_msg = ServerMessage::Hello {
        version: PROTOCOL_VERSION,
        capabilities: Some(v1_capabilities()),
    };

    if let Err(e) = send_message(&mut socket, &hello_msg).await {
        error!("Failed to send Hello message: {}", e);
        return;
    }

    loop {
        match socket.recv().await {
            Some(Ok(Message::Binary(data))) => {
                trace!("Received binary client message: {} bytes", data.len());
                if let Err(e) = handle_client_message(&data, &mut socket, &handler_ctx).await {
                    warn!("Error handling client message: {}", e);
                    if let Err(send_err) = send_message(
                        &mut socket,
                        &ServerMessage::Error {
                            code: "message_error".to_string(),
                            message: e.clone(),
                        },
                    )
                    .await
                    {
                        error!("Failed to send error message: {}", send_err);
                        break;
                    }
                }
            }
            Some(Ok(Message::Close(_))) => {
                info!("WebSocket connection closed by client");
                break;
            }
            Some(Ok(Message::Text(_))) => {
                warn!("Received text message, binary MessagePack expected");
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                // Handled automatically by axum
            }
            Some(Err(e)) => {
                error!("WebSocket error: {}", e);
                break;
            }
            None => {
                info!("WebSocket connection closed (recv returned None)");
                break;
            }
        }
    }

    info!("WebSocket connection handler finished");
}

/// Send a server message over WebSocket
pub async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), String> {
    // 使用 to_vec_named 确保输出字典格式（带字段名），而不是数组格式
    let bytes = rmp_serde::to_vec_named(msg).map_err(|e| e.to_string())?;
    socket
        .send(Message::Binary(bytes))
        .await
        .map_err(|e| e.to_string())
}

/// Handle a client message: 统一调度层
///
/// 支持两种消息格式：
/// 1. 带 `id` 的 RequestEnvelope（exchange 回复中以 `exchange_id` 回显）
/// 2. 裸 ClientMessage
async fn handle_client_message(
    data: &[u8],
    socket: &mut WebSocket,
    ctx: &HandlerContext,
) -> Result<(), String> {
    let envelope: RequestEnvelope = rmp_serde::from_slice(data).map_err(|e| {
        error!("Failed to parse client message: {}", e);
        format!("Parse error: {}", e)
    })?;

    let request_id = envelope.id;
    let client_msg = envelope.body;
    debug!(
        "Parsed client message: {:?}",
        std::mem::discriminant(&client_msg)
    );

    if handlers::endpoint::handle_endpoint_message(&client_msg, socket, ctx).await? {
        return Ok(());
    }

    if handlers::exchange::handle_exchange_message(
        &client_msg,
        request_id.as_deref(),
        socket,
        ctx,
    )
    .await?
    {
        return Ok(());
    }

    match client_msg {
        ClientMessage::Ping => {
            send_message(socket, &ServerMessage::Pong).await?;
        }

        // 所有其他消息类型已在上方 handler 链中处理，此处兜底
        _ => {
            warn!(
                "Unhandled message type: {:?}",
                std::mem::discriminant(&client_msg)
            );
            send_message(
                socket,
                &ServerMessage::Error {
                    code: "unhandled_message".to_string(),
                    message: "Message type not recognized".to_string(),
                },
            )
            .await?;
        }
    }

    Ok(())
}
