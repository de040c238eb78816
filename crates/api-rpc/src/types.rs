//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Device methods carry the pairing
//! `token` alongside their own parameters.

use adbridge_core::domain::{Device, Package};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// health.v1 - Liveness check (no params, no token)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub paired: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
}

/// pair.v1 - Obtain the session token (no params, once per daemon)
#[derive(Debug, Clone, Serialize)]
pub struct PairResponse {
    pub token: String,
}

/// adb.version.v1 / adb.devices.v1 - token only
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

/// adb.packages.v1 - List packages on a device
#[derive(Debug, Deserialize)]
pub struct PackagesRequest {
    #[serde(default)]
    pub token: String,
    pub device_id: String,
    #[serde(default)]
    pub include_system: bool,
    #[serde(default)]
    pub uninstalled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackagesResponse {
    pub device_id: String,
    pub packages: Vec<Package>,
}

/// adb.install.v1 - Install a local APK
#[derive(Debug, Deserialize)]
pub struct InstallRequest {
    #[serde(default)]
    pub token: String,
    pub device_id: String,
    /// Local path on the daemon host; `~` is expanded
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallResponse {
    pub device_id: String,
    pub installed: bool,
    pub duration_ms: u64,
}

/// adb.uninstall.v1 - Remove a package
#[derive(Debug, Deserialize)]
pub struct UninstallRequest {
    #[serde(default)]
    pub token: String,
    pub device_id: String,
    pub package: String,
    #[serde(default)]
    pub keep_data: bool,
    #[serde(default = "default_user")]
    pub user: i32,
}

/// -1 leaves `--user` off the command line
fn default_user() -> i32 {
    -1
}

#[derive(Debug, Clone, Serialize)]
pub struct UninstallResponse {
    pub device_id: String,
    pub package: String,
    pub uninstalled: bool,
}
