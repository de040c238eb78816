// Output parsers for `adb devices -l` and `pm list packages -f`
//
// Pure functions: malformed lines are skipped, never reported.

use crate::domain::{Device, ListPackageOptions, Package};

const DEVICE_LIST_BANNER: &str = "List of devices";
const DAEMON_NOTICE_PREFIX: char = '*';
const PACKAGE_PREFIX: &str = "package:";
const MODEL_KEY: &str = "model:";
const MANUFACTURER_KEY: &str = "manufacturer:";

/// Parse `adb devices -l` output
///
/// ```text
/// List of devices attached
/// 33011JEHN19347         device product:lynx_beta model:Pixel_7a device:lynx transport_id:2
/// emulator-5554          unauthorized transport_id:1
/// ```
///
/// The first non-blank line is the banner and is dropped. Daemon notices
/// (`* daemon not running; starting now ...`) are dropped wherever they appear.
/// Rows with fewer than two fields are skipped. Source order is kept.
pub fn parse_devices(text: &str) -> Vec<Device> {
    let mut devices = Vec::new();
    let mut banner_seen = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(DAEMON_NOTICE_PREFIX) {
            continue;
        }
        if !banner_seen {
            banner_seen = true;
            continue;
        }
        if line.starts_with(DEVICE_LIST_BANNER) {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }

        let mut device = Device::new(fields[0], fields[1]);
        for field in &fields[2..] {
            if let Some(model) = field.strip_prefix(MODEL_KEY) {
                device.model = non_empty(model);
            } else if let Some(manufacturer) = field.strip_prefix(MANUFACTURER_KEY) {
                device.manufacturer = non_empty(manufacturer);
            }
        }

        devices.push(device);
    }

    devices
}

/// Parse `pm list packages -f` output (`package:<apk-path>=<name>`)
///
/// The last `=` splits path from name since apk paths may contain `=`.
/// Lines without the prefix or without an `=` are skipped, and so are lines
/// with an empty name (`package:/x.apk=`): a package without a name cannot
/// be addressed by uninstall, so it is dropped rather than returned blank.
/// `is_system` echoes the request filter.
pub fn parse_packages(text: &str, options: &ListPackageOptions) -> Vec<Package> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            let rest = line.strip_prefix(PACKAGE_PREFIX)?;
            let (apk_path, name) = rest.rsplit_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some(Package {
                name: name.to_string(),
                apk_path: apk_path.to_string(),
                is_system: options.include_system,
            })
        })
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
