// Application Layer - Device-bridge use cases

pub mod client;
pub mod config;
pub mod constants;
pub mod lock_registry;
pub mod parser;

// Re-exports
pub use client::AdbClient;
pub use config::AdbConfig;
pub use lock_registry::{DeviceLease, DeviceLockRegistry};
