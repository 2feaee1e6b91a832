use axum::extract::ws::WebSocket;
use tracing::{info, warn};

use crate::server::context::{is_inline_uri, AppError, HandlerContext};
use crate::server::protocol::{ClientMessage, EndpointInfo, ServerMessage};
use crate::server::ws::send_message;

/// 处理 endpoint 注册表相关的客户端消息
pub async fn handle_endpoint_message(
    client_msg: &ClientMessage,
    socket: &mut WebSocket,
    ctx: &HandlerContext,
) -> Result<bool, String> {
    match client_msg {
        ClientMessage::ListEndpoints => {
            let items: Vec<EndpointInfo> = {
                let registry = ctx.registry.read().await;
                registry
                    .list()
                    .into_iter()
                    .map(|(name, endpoint)| EndpointInfo {
                        name: name.to_string(),
                        endpoint: endpoint.clone(),
                    })
                    .collect()
            };
            send_message(socket, &ServerMessage::Endpoints { items }).await?;
            Ok(true)
        }

        ClientMessage::RegisterEndpoint { name, endpoint } => {
            let name = name.trim();
            if name.is_empty() || is_inline_uri(name) {
                let err = AppError::InvalidEndpoint(format!(
                    "'{}' cannot be used as an endpoint name",
                    name
                ));
                send_message(socket, &err.to_server_error()).await?;
                return Ok(true);
            }

            let replaced = ctx
                .registry
                .write()
                .await
                .register(name, endpoint.clone())
                .is_some();
            info!(
                "RegisterEndpoint: name={}, replaced={}, endpoint={:?}",
                name, replaced, endpoint
            );
            request_save(ctx).await;

            send_message(
                socket,
                &ServerMessage::EndpointRegistered {
                    name: name.to_string(),
                },
            )
            .await?;
            Ok(true)
        }

        ClientMessage::RemoveEndpoint { name } => {
            let removed = ctx.registry.write().await.remove(name.trim()).is_some();
            if removed {
                info!("RemoveEndpoint: name={}", name);
                request_save(ctx).await;
                send_message(
                    socket,
                    &ServerMessage::EndpointRemoved { name: name.clone() },
                )
                .await?;
            } else {
                let err = AppError::EndpointNotFound(name.clone());
                send_message(socket, &err.to_server_error()).await?;
            }
            Ok(true)
        }

        _ => Ok(false),
    }
}

async fn request_save(ctx: &HandlerContext) {
    if let Err(e) = ctx.save_tx.send(()).await {
        warn!("Failed to schedule registry save: {}", e);
    }
}
