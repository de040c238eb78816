// Package Domain Model

use serde::{Deserialize, Serialize};

/// An installed package on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Reverse-domain identifier (e.g. `com.example.app`)
    pub name: String,
    /// On-device path of the installed artifact
    pub apk_path: String,
    /// Echoes `ListPackageOptions::include_system` of the request.
    ///
    /// Not derived from the tool output: `pm list packages -s` and `-u` can
    /// return mixed sets, so this flag is only as accurate as the filter that
    /// produced the listing.
    pub is_system: bool,
}

/// Filter for a package listing (request-scoped, never stored)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPackageOptions {
    /// `true` lists system packages (`-s`), `false` third-party only (`-3`)
    #[serde(default)]
    pub include_system: bool,
    /// Include packages uninstalled but with data retained (`-u`)
    #[serde(default)]
    pub include_uninstalled: bool,
}

/// Check that a package name only uses letters, digits, dot and underscore.
///
/// The name ends up as an argument of a device-side shell command, so
/// anything outside this set is refused before any process is spawned.
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}
