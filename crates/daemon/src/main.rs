//! adbridge daemon - Main Entry Point
//! Resolves adb, wires the client and serves it over JSON-RPC on localhost

mod config;
mod logging;
mod port;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use adbridge_api_rpc::{RpcServer, RpcServerConfig, SessionState};
use adbridge_core::port::UuidProvider;
use adbridge_core::{AdbClient, CallContext};
use adbridge_infra_system::SubprocessRunner;
use config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env()?;
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;

    info!("adbridge v{} starting...", VERSION);

    // 2. Resolve adb up front so a bad path fails here, not on first request
    let runner = SubprocessRunner::new(&config.adb_path)
        .with_context(|| format!("Cannot use adb at '{}'", config.adb_path.display()))?;
    let adb_config = config.adb_config(runner.tool_path());
    let client = Arc::new(
        AdbClient::new(adb_config, Arc::new(runner), Arc::new(UuidProvider))
            .context("Invalid adb client configuration")?,
    );

    match client.version(&CallContext::background()).await {
        Ok(version) => info!(
            adb_version = %version.lines().next().unwrap_or_default(),
            "adb is available"
        ),
        Err(e) => warn!(error = %e, "adb version check failed (continuing)"),
    }

    // 3. Start JSON-RPC server
    let port = config
        .rpc_port
        .unwrap_or_else(|| port::pick_port(&config.rpc_host));
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port,
    };
    let session = Arc::new(SessionState::new());
    let (addr, rpc_handle) = RpcServer::new(rpc_config, client, session)
        .start()
        .await
        .context("RPC server start failed")?;

    info!(
        pairing_code = addr.port(),
        url = %format!("http://{addr}"),
        "System ready. Pair with: adbridge --port {} pair",
        addr.port()
    );
    info!("Press Ctrl+C to shutdown");

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    info!("Shutdown complete.");

    Ok(())
}
