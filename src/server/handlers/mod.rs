// handlers module - Protocol message handlers
// Contains handlers for the endpoint registry and Git exchanges

pub mod endpoint;
pub mod exchange;
