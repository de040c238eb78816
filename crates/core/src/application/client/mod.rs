// Device-Bridge Client
// Public facade: validation, timeouts, per-device locking, runner, parsers

mod staging;
#[cfg(test)]
mod tests;

use crate::application::config::AdbConfig;
use crate::application::constants::{op, REMOTE_STAGING_DIR, STAGING_PREFIX, VERSION_TIMEOUT};
use crate::application::lock_registry::DeviceLockRegistry;
use crate::application::parser::{parse_devices, parse_packages};
use crate::context::{CallContext, DoneReason};
use crate::domain::error::Result;
use crate::domain::{
    is_valid_package_name, BridgeError, Device, ListPackageOptions, Outcome, Package, Verdict,
};
use crate::port::{IdProvider, ProcessOutput, ProcessRunner, RunError};
use staging::{LocalStaging, RemoteStaging};
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Device-bridge client
///
/// | Operation | Lock       | Timeout         |
/// |-----------|------------|-----------------|
/// | version   | no         | 5s fixed        |
/// | devices   | no         | read_timeout    |
/// | packages  | no         | read_timeout    |
/// | install   | per-serial | install_timeout |
/// | uninstall | per-serial | read_timeout    |
///
/// For locked operations the timeout covers the lock wait as well, so a call
/// never sits behind a stuck holder past its own deadline.
pub struct AdbClient {
    config: AdbConfig,
    runner: Arc<dyn ProcessRunner>,
    id_provider: Arc<dyn IdProvider>,
    locks: DeviceLockRegistry,
}

impl AdbClient {
    /// Create a client; an invalid configuration fails here, not on first call
    pub fn new(
        config: AdbConfig,
        runner: Arc<dyn ProcessRunner>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            tool_path = %config.tool_path.display(),
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            install_timeout_ms = config.install_timeout.as_millis() as u64,
            temp_dir = %config.temp_dir.display(),
            "Device-bridge client ready"
        );

        Ok(Self {
            config,
            runner,
            id_provider,
            locks: DeviceLockRegistry::new(),
        })
    }

    pub fn config(&self) -> &AdbConfig {
        &self.config
    }

    pub fn locks(&self) -> &DeviceLockRegistry {
        &self.locks
    }

    /// `adb version`, trimmed
    pub async fn version(&self, ctx: &CallContext) -> Result<String> {
        let ctx = ctx.with_timeout(VERSION_TIMEOUT);
        let output = self.invoke(&ctx, op::VERSION, "", &["version"]).await?;
        let output = require_exit_ok(op::VERSION, "", output)?;
        Ok(stdout_text(op::VERSION, &output)?.trim().to_string())
    }

    /// `adb devices -l`
    pub async fn devices(&self, ctx: &CallContext) -> Result<Vec<Device>> {
        let ctx = ctx.with_timeout(self.config.read_timeout);
        let output = self.invoke(&ctx, op::DEVICES, "", &["devices", "-l"]).await?;
        let output = require_exit_ok(op::DEVICES, "", output)?;
        let devices = parse_devices(stdout_text(op::DEVICES, &output)?);

        debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    /// `adb -s <serial> shell pm list packages -f [-u] (-s|-3)`
    pub async fn packages(
        &self,
        ctx: &CallContext,
        serial: &str,
        options: ListPackageOptions,
    ) -> Result<Vec<Package>> {
        require_serial(serial)?;

        let ctx = ctx.with_timeout(self.config.read_timeout);
        let args = package_list_args(&options);
        let output = self.invoke(&ctx, op::PACKAGES, serial, &args).await?;
        let output = require_exit_ok(op::PACKAGES, serial, output)?;
        let packages = parse_packages(stdout_text(op::PACKAGES, &output)?, &options);

        debug!(serial = %serial, count = packages.len(), "Listed packages");
        Ok(packages)
    }

    /// Push `source` to the device staging dir and run `pm install -r` on it
    ///
    /// The local staging copy is removed on every exit path. The on-device
    /// copy is removed by a detached task once the push was attempted, even if
    /// `ctx` was cancelled; its failures are only logged.
    pub async fn install(&self, ctx: &CallContext, serial: &str, source: &Path) -> Result<()> {
        require_serial(serial)?;
        validate_source(source).await?;

        let ctx = ctx.with_timeout(self.config.install_timeout);
        let started = Instant::now();
        let _lease = self.locks.acquire_until(&ctx, op::INSTALL, serial).await?;

        let file_name = format!("{}{}.apk", STAGING_PREFIX, self.id_provider.generate_id());
        let local = tokio::select! {
            staged = LocalStaging::copy_from(source, self.config.temp_dir.join(&file_name)) => staged?,
            reason = ctx.done() => return Err(interrupted(reason, op::INSTALL, serial, started)),
        };
        let local_path = local.path().to_str().ok_or_else(|| {
            BridgeError::Config(format!(
                "temp_dir is not valid UTF-8: {}",
                self.config.temp_dir.display()
            ))
        })?;

        let remote = RemoteStaging::new(
            Arc::clone(&self.runner),
            serial,
            format!("{REMOTE_STAGING_DIR}/{file_name}"),
            self.config.cleanup_timeout,
        );

        let pushed = self
            .invoke(&ctx, op::PUSH, serial, &["push", local_path, remote.remote_path()])
            .await?;
        require_exit_ok(op::PUSH, serial, pushed)?;

        let output = self
            .invoke(
                &ctx,
                op::INSTALL,
                serial,
                &["shell", "pm", "install", "-r", remote.remote_path()],
            )
            .await?;
        check_outcome(op::INSTALL, serial, &output)?;

        info!(
            serial = %serial,
            source = %source.display(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Package installed"
        );
        Ok(())
    }

    /// `pm uninstall [--user <n>] [-k] <package>`
    ///
    /// `user >= 0` targets that user profile; negative means the default.
    pub async fn uninstall(
        &self,
        ctx: &CallContext,
        serial: &str,
        package: &str,
        keep_data: bool,
        user: i32,
    ) -> Result<()> {
        require_serial(serial)?;
        if !is_valid_package_name(package) {
            return Err(BridgeError::Precondition(format!(
                "invalid package name '{package}'"
            )));
        }

        let ctx = ctx.with_timeout(self.config.read_timeout);
        let _lease = self.locks.acquire_until(&ctx, op::UNINSTALL, serial).await?;

        let user_id = user.to_string();
        let args = uninstall_args(package, keep_data, (user >= 0).then_some(user_id.as_str()));
        let output = self.invoke(&ctx, op::UNINSTALL, serial, &args).await?;
        check_outcome(op::UNINSTALL, serial, &output)?;

        info!(serial = %serial, package = %package, keep_data, user, "Package uninstalled");
        Ok(())
    }

    /// Run the tool and attach operation context to invocation errors
    async fn invoke(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        serial: &str,
        args: &[&str],
    ) -> Result<ProcessOutput> {
        let started = Instant::now();
        debug!(operation, serial = %serial, args = ?args, "Invoking device-bridge tool");

        match self.runner.run(ctx, serial, args).await {
            Ok(output) => {
                debug!(
                    operation,
                    serial = %serial,
                    exit_code = ?output.exit_code,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Device-bridge tool finished"
                );
                Ok(output)
            }
            Err(e) => {
                warn!(operation, serial = %serial, error = %e, "Device-bridge tool did not complete");
                Err(map_run_error(e, operation, serial))
            }
        }
    }
}

fn require_serial(serial: &str) -> Result<()> {
    if serial.trim().is_empty() {
        return Err(BridgeError::Precondition("serial is required".to_string()));
    }
    Ok(())
}

/// The artifact must exist, be a regular file and be readable
async fn validate_source(source: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(source).await.map_err(|e| {
        BridgeError::Precondition(format!("apk '{}' is not accessible: {e}", source.display()))
    })?;
    if !metadata.is_file() {
        return Err(BridgeError::Precondition(format!(
            "apk '{}' is not a regular file",
            source.display()
        )));
    }
    tokio::fs::File::open(source).await.map_err(|e| {
        BridgeError::Precondition(format!("apk '{}' is not readable: {e}", source.display()))
    })?;
    Ok(())
}

fn package_list_args(options: &ListPackageOptions) -> Vec<&'static str> {
    let mut args = vec!["shell", "pm", "list", "packages", "-f"];
    if options.include_uninstalled {
        args.push("-u");
    }
    args.push(if options.include_system { "-s" } else { "-3" });
    args
}

fn uninstall_args<'a>(package: &'a str, keep_data: bool, user: Option<&'a str>) -> Vec<&'a str> {
    let mut args = vec!["shell", "pm", "uninstall"];
    if let Some(user) = user {
        args.extend(["--user", user]);
    }
    if keep_data {
        args.push("-k");
    }
    args.push(package);
    args
}

fn map_run_error(err: RunError, operation: &'static str, serial: &str) -> BridgeError {
    match err {
        RunError::Spawn(reason) => BridgeError::Spawn { operation, reason },
        RunError::Timeout(after) => BridgeError::Timeout {
            operation,
            serial: serial.to_string(),
            after,
        },
        RunError::Cancelled => BridgeError::Cancelled {
            operation,
            serial: serial.to_string(),
        },
        RunError::Io(reason) => BridgeError::Process {
            operation,
            serial: serial.to_string(),
            exit_code: None,
            stderr: reason,
        },
    }
}

fn interrupted(
    reason: DoneReason,
    operation: &'static str,
    serial: &str,
    started: Instant,
) -> BridgeError {
    match reason {
        DoneReason::DeadlineExceeded => BridgeError::Timeout {
            operation,
            serial: serial.to_string(),
            after: started.elapsed(),
        },
        DoneReason::Cancelled => BridgeError::Cancelled {
            operation,
            serial: serial.to_string(),
        },
    }
}

fn require_exit_ok(
    operation: &'static str,
    serial: &str,
    output: ProcessOutput,
) -> Result<ProcessOutput> {
    if output.success() {
        return Ok(output);
    }
    Err(BridgeError::Process {
        operation,
        serial: serial.to_string(),
        exit_code: output.exit_code,
        stderr: output.stderr_lossy().trim().to_string(),
    })
}

fn stdout_text<'a>(operation: &'static str, output: &'a ProcessOutput) -> Result<&'a str> {
    output.stdout_text().map_err(|e| BridgeError::Parse {
        operation,
        reason: e.to_string(),
    })
}

/// Apply the marker decision table to a package-manager invocation
fn check_outcome(operation: &'static str, serial: &str, output: &ProcessOutput) -> Result<()> {
    let stdout = output.stdout_lossy();
    let stderr = output.stderr_lossy();

    match Outcome::observe(output.success(), &stdout, &stderr).verdict() {
        Verdict::Success => Ok(()),
        Verdict::ProcessFailed => Err(BridgeError::Process {
            operation,
            serial: serial.to_string(),
            exit_code: output.exit_code,
            stderr: stderr.trim().to_string(),
        }),
        verdict => Err(BridgeError::Outcome {
            operation,
            serial: serial.to_string(),
            verdict,
            output: format!("{} {}", stdout.trim(), stderr.trim())
                .trim()
                .to_string(),
        }),
    }
}
