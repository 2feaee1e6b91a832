use axum::extract::ws::WebSocket;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::endpoint::GitEndpoint;
use crate::producer::{Exchange, GitProducer, Processor};
use crate::server::context::{is_inline_uri, resolve_endpoint, HandlerContext};
use crate::server::protocol::{ClientMessage, ServerMessage};
use crate::server::ws::send_message;

/// Label reported instead of an inline URI, which may carry credentials
pub const INLINE_ENDPOINT_LABEL: &str = "<inline>";

/// 处理 exchange 消息：解析 endpoint，执行一次 Git 操作并回传结果
pub async fn handle_exchange_message(
    client_msg: &ClientMessage,
    request_id: Option<&str>,
    socket: &mut WebSocket,
    ctx: &HandlerContext,
) -> Result<bool, String> {
    match client_msg {
        ClientMessage::Exchange { endpoint, headers } => {
            let resolved = match resolve_endpoint(&ctx.registry, endpoint).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    send_message(socket, &e.to_server_error()).await?;
                    return Ok(true);
                }
            };

            let exchange = new_exchange(request_id, headers.clone());
            let reply = run_exchange(endpoint, resolved, exchange).await;
            send_message(socket, &reply).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Exchange carrying the request id when the client sent one
pub fn new_exchange(request_id: Option<&str>, headers: HashMap<String, String>) -> Exchange {
    let exchange = match request_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => Exchange::with_id(id),
        None => Exchange::new(),
    };
    exchange.with_headers(headers)
}

/// Run one exchange through a fresh producer and build the reply
///
/// Failures become an `ok: false` result; they never end the connection.
pub async fn run_exchange(
    endpoint_ref: &str,
    endpoint: GitEndpoint,
    exchange: Exchange,
) -> ServerMessage {
    let label = if is_inline_uri(endpoint_ref) {
        INLINE_ENDPOINT_LABEL.to_string()
    } else {
        endpoint_ref.trim().to_string()
    };
    let exchange_id = exchange.id.clone();
    let producer = GitProducer::new(endpoint);
    let requested = producer.resolve_operation(&exchange).ok();

    match producer.process(exchange).await {
        Ok(done) => {
            info!(
                "Exchange {} on {}: {} ok",
                exchange_id,
                label,
                done.operation.map(|op| op.as_str()).unwrap_or("-")
            );
            ServerMessage::ExchangeResult {
                exchange_id,
                endpoint: label,
                operation: done.operation,
                ok: true,
                body: done.body,
                error_code: None,
                message: None,
            }
        }
        Err(e) => {
            warn!("Exchange {} on {} failed: {}", exchange_id, label, e);
            ServerMessage::ExchangeResult {
                exchange_id,
                endpoint: label,
                operation: e.operation().or(requested),
                ok: false,
                body: None,
                error_code: Some(e.code().to_string()),
                message: Some(e.to_string()),
            }
        }
    }
}
