// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod process_runner;

// Re-exports
pub use id_provider::{IdProvider, UuidProvider};
pub use process_runner::{device_args, ProcessOutput, ProcessRunner, RunError};
