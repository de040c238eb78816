// adbridge Core - Device-bridge domain, ports and client
// NO process spawning here: the ProcessRunner port is implemented in infra-system

pub mod application;
pub mod context;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{AdbClient, AdbConfig};
pub use context::CallContext;
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
