// Domain Layer - Device-bridge records and rules

pub mod device;
pub mod error;
pub mod outcome;
pub mod package;

// Re-exports
pub use device::{Device, DeviceState, Serial};
pub use error::BridgeError;
pub use outcome::{Outcome, Verdict, FAILURE_MARKER, SUCCESS_MARKER};
pub use package::{is_valid_package_name, ListPackageOptions, Package};
