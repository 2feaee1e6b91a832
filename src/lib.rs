//! Message-driven Git endpoints
//!
//! A client addresses an exchange to a Git endpoint; the producer reads the
//! operation from the endpoint or the exchange headers, runs it against
//! libgit2 and puts the result on the exchange body.

pub mod endpoint;
pub mod producer;
pub mod server;
pub mod util;
