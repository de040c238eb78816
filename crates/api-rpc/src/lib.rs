//! JSON-RPC API Layer
//!
//! Exposes the device-bridge client over JSON-RPC 2.0 on localhost,
//! guarded by a single pairing token.

pub mod error;
pub mod handler;
pub mod server;
pub mod session;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
pub use session::SessionState;
