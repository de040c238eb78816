//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use adbridge_core::domain::BridgeError;
use adbridge_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use serde_json::json;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const UNAUTHORIZED: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const TIMEOUT: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DEVICE_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Bridge(e) => bridge_error(e),
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Unauthorized(msg) => {
            ErrorObjectOwned::owned(code::UNAUTHORIZED, msg, None::<()>)
        }
        AppError::Conflict(msg) => ErrorObjectOwned::owned(code::CONFLICT, msg, None::<()>),
        AppError::Io(e) => ErrorObjectOwned::owned(code::SYSTEM_ERROR, e.to_string(), None::<()>),
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

/// Bridge failures carry `{"retryable": bool}` as error data
fn bridge_error(err: BridgeError) -> ErrorObjectOwned {
    let code = match &err {
        BridgeError::Precondition(_) => code::VALIDATION_ERROR,
        BridgeError::Config(_) => code::INTERNAL_ERROR,
        BridgeError::Timeout { .. }
        | BridgeError::Cancelled { .. }
        | BridgeError::LockTimeout { .. } => code::TIMEOUT,
        BridgeError::Process { .. } | BridgeError::Outcome { .. } | BridgeError::Parse { .. } => {
            code::DEVICE_ERROR
        }
        BridgeError::Spawn { .. } | BridgeError::Io(_) => code::SYSTEM_ERROR,
    };
    let retryable = err.is_retryable();

    ErrorObjectOwned::owned(code, err.to_string(), Some(json!({ "retryable": retryable })))
}
