// Device-bridge client configuration

use crate::application::constants::{
    DEFAULT_CLEANUP_TIMEOUT, DEFAULT_INSTALL_TIMEOUT, DEFAULT_READ_TIMEOUT,
};
use crate::domain::BridgeError;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, immutable once the client is built
#[derive(Debug, Clone)]
pub struct AdbConfig {
    /// Path or bare name of the `adb` executable
    pub tool_path: PathBuf,
    /// Bound of listings and uninstall
    pub read_timeout: Duration,
    /// Bound of a whole install (lock wait included)
    pub install_timeout: Duration,
    /// Where local staging copies of artifacts are written
    pub temp_dir: PathBuf,
    /// Bound of the detached on-device cleanup
    pub cleanup_timeout: Duration,
}

impl AdbConfig {
    /// Configuration with default timeouts and the platform temp dir
    pub fn new(tool_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
            temp_dir: std::env::temp_dir(),
            cleanup_timeout: DEFAULT_CLEANUP_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    /// Reject configurations that could never serve a call
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.tool_path.as_os_str().is_empty() {
            return Err(BridgeError::Config("adb path is required".to_string()));
        }
        for (name, value) in [
            ("read_timeout", self.read_timeout),
            ("install_timeout", self.install_timeout),
            ("cleanup_timeout", self.cleanup_timeout),
        ] {
            if value.is_zero() {
                return Err(BridgeError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.temp_dir.as_os_str().is_empty() {
            return Err(BridgeError::Config("temp_dir must not be empty".to_string()));
        }
        Ok(())
    }
}
