//! Fake `adb` executables for end-to-end tests
//!
//! Each fake is a POSIX shell script in its own temp dir. It appends its
//! argument list to `calls.log`, strips a leading `-s <serial>`, then runs
//! the body given by the test. `$DIR` points at the fake's directory.

#![allow(dead_code)]

use adbridge_core::port::id_provider::mocks::SequentialIdProvider;
use adbridge_core::{AdbClient, AdbConfig};
use adbridge_infra_system::SubprocessRunner;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const DEVICES_SAMPLE: &str = "List of devices attached\n\
emulator-5554\tdevice product:sdk_gphone64 model:sdk_gphone64_x86_64 device:emu64x manufacturer:Google transport_id:1\n\
R58M123ABC\tunauthorized usb:1-1 transport_id:2\n\
0123456789\toffline\n";

pub struct FakeAdb {
    dir: TempDir,
    staging: TempDir,
    path: PathBuf,
}

impl FakeAdb {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let path = dir.path().join("adb");
        let script = format!(
            "#!/bin/sh\nDIR='{}'\necho \"$*\" >> \"$DIR/calls.log\"\n[ \"$1\" = \"-s\" ] && shift 2\n{}\n",
            dir.path().display(),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir, staging, path }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Local staging directory the client is configured with
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    pub fn config(&self) -> AdbConfig {
        AdbConfig::new(&self.path)
            .with_temp_dir(self.staging.path())
            .with_cleanup_timeout(Duration::from_secs(5))
    }

    pub fn client(&self) -> AdbClient {
        self.client_with(self.config())
    }

    pub fn client_with(&self, config: AdbConfig) -> AdbClient {
        let runner = SubprocessRunner::new(&self.path)
            .unwrap()
            .with_grace_period(Duration::from_millis(500));
        AdbClient::new(
            config,
            Arc::new(runner),
            Arc::new(SequentialIdProvider::new("e2e")),
        )
        .unwrap()
    }

    /// Argument lists of every invocation so far, serial included
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Poll until an invocation containing `needle` shows up
    pub async fn wait_for_call(&self, needle: &str) -> bool {
        for _ in 0..100 {
            if self.calls().iter().any(|c| c.contains(needle)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

pub fn write_apk(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
