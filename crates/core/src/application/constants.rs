// Device-bridge constants (no magic values in the client)
use std::time::Duration;

/// Fixed timeout of the version query (5s)
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout of read-only listings and uninstall (15s)
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout of a whole install: lock wait, push and pm install (8 min)
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(8 * 60);

/// Own deadline of the detached on-device cleanup after an install (30s)
pub const DEFAULT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

/// On-device staging directory for pushed artifacts
pub const REMOTE_STAGING_DIR: &str = "/data/local/tmp";

/// File name prefix of staged artifacts (local and remote)
pub const STAGING_PREFIX: &str = "adbridge-";

/// Operation names used in errors and logs
pub mod op {
    pub const VERSION: &str = "version";
    pub const DEVICES: &str = "devices";
    pub const PACKAGES: &str = "packages";
    pub const PUSH: &str = "push";
    pub const INSTALL: &str = "install";
    pub const UNINSTALL: &str = "uninstall";
    pub const CLEANUP: &str = "cleanup";
}
