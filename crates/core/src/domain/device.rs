// Device Domain Model

use serde::{Deserialize, Serialize};

/// Device serial (unique per physical/virtual unit)
pub type Serial = String;

/// Connection state reported by `adb devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Device,
    Unauthorized,
    Offline,
    Unknown,
}

impl DeviceState {
    /// Map the raw state column to a known state. Anything unrecognized is `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "device" => DeviceState::Device,
            "unauthorized" => DeviceState::Unauthorized,
            "offline" => DeviceState::Offline,
            _ => DeviceState::Unknown,
        }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Device => write!(f, "device"),
            DeviceState::Unauthorized => write!(f, "unauthorized"),
            DeviceState::Offline => write!(f, "offline"),
            DeviceState::Unknown => write!(f, "unknown"),
        }
    }
}

/// A connected device as seen by the bridge tool
///
/// Produced fresh on every listing; nothing is cached between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "device_id")]
    pub serial: Serial,
    #[serde(rename = "status")]
    pub state: DeviceState,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    #[serde(rename = "authorized")]
    pub is_authorized: bool,
}

impl Device {
    /// Build a device from its serial and raw state column
    pub fn new(serial: impl Into<Serial>, raw_state: &str) -> Self {
        let state = DeviceState::from_raw(raw_state);
        Self {
            serial: serial.into(),
            is_authorized: raw_state == "device",
            state,
            model: None,
            manufacturer: None,
        }
    }
}
