pub mod context;
pub mod git;
pub mod handlers;
pub mod protocol;
pub mod ws;

pub use context::{resolve_endpoint, AppError, HandlerContext};
pub use git::GitError;
pub use protocol::{ClientMessage, EndpointInfo, RequestEnvelope, ServerMessage, PROTOCOL_VERSION};
pub use ws::{load_registry, router, run_server, serve, AppContext};
