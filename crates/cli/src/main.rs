//! adbridge CLI - talks to a running adbridge daemon over JSON-RPC

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use tabled::{Table, Tabled};

const RPC_HOST: &str = "127.0.0.1";

#[derive(Parser)]
#[command(name = "adbridge")]
#[command(about = "Manage Android devices through the adbridge daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Daemon port (the pairing code it printed at startup)
    #[arg(long, env = "ADBRIDGE_RPC_PORT")]
    port: Option<u16>,

    /// Full RPC URL, overrides --port
    #[arg(long, env = "ADBRIDGE_RPC_URL")]
    rpc_url: Option<String>,

    /// Session token from `adbridge pair`
    #[arg(long, env = "ADBRIDGE_TOKEN", default_value = "", hide_env_values = true)]
    token: String,
}

impl Cli {
    fn url(&self) -> Result<String> {
        match (&self.rpc_url, self.port) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(port)) => Ok(format!("http://{RPC_HOST}:{port}")),
            (None, None) => anyhow::bail!("daemon address unknown: pass --port or --rpc-url"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pair with the daemon and print the session token
    Pair,

    /// Check that the daemon is up
    Health,

    /// Show the adb version used by the daemon
    Version,

    /// List connected devices
    Devices,

    /// List packages on a device
    Packages {
        /// Device serial
        device_id: String,

        /// System packages instead of third-party ones
        #[arg(long)]
        system: bool,

        /// Include uninstalled packages that kept their data
        #[arg(long)]
        uninstalled: bool,
    },

    /// Install an APK on a device
    Install {
        /// Device serial
        device_id: String,

        /// Path to the APK
        apk: PathBuf,
    },

    /// Uninstall a package from a device
    Uninstall {
        /// Device serial
        device_id: String,

        /// Package name (e.g. com.example.app)
        package: String,

        /// Keep the app data and cache directories
        #[arg(short, long)]
        keep_data: bool,

        /// Only for this user id
        #[arg(long, default_value = "-1", allow_negative_numbers = true)]
        user: i32,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct DeviceInfo {
    device_id: String,
    status: String,
    model: Option<String>,
    manufacturer: Option<String>,
    authorized: bool,
}

#[derive(Tabled)]
struct DeviceRow {
    device_id: String,
    status: String,
    authorized: String,
    model: String,
    manufacturer: String,
}

impl From<DeviceInfo> for DeviceRow {
    fn from(d: DeviceInfo) -> Self {
        Self {
            device_id: d.device_id,
            status: d.status,
            authorized: if d.authorized { "yes".into() } else { "no".into() },
            model: d.model.unwrap_or_else(|| "-".into()),
            manufacturer: d.manufacturer.unwrap_or_else(|| "-".into()),
        }
    }
}

#[derive(Deserialize, Tabled)]
struct PackageRow {
    name: String,
    apk_path: String,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.url()?;
    let token = cli.token.as_str();

    match &cli.command {
        Commands::Pair => {
            let result = call_rpc(&url, "pair.v1", json!({})).await?;
            let token = result["token"].as_str().unwrap_or_default();

            println!("{}", "✓ Paired with daemon".green().bold());
            println!();
            println!("  export ADBRIDGE_TOKEN={}", token);
        }

        Commands::Health => {
            println!("{}", "Daemon Status".cyan().bold());
            println!();

            match call_rpc(&url, "health.v1", json!({})).await {
                Ok(health) => {
                    println!("  {} {}", "RPC URL:".bold(), url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!("  {} {}", "Version:".bold(), health["version"]);
                    println!("  {} {}", "Paired:".bold(), health["paired"]);
                    println!("  {} {} seconds", "Uptime:".bold(), health["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Version => {
            let result = call_rpc(&url, "adb.version.v1", json!({ "token": token })).await?;
            println!("{}", result["version"].as_str().unwrap_or_default());
        }

        Commands::Devices => {
            let result = call_rpc(&url, "adb.devices.v1", json!({ "token": token })).await?;
            let devices: Vec<DeviceInfo> = serde_json::from_value(result["devices"].clone())?;

            if devices.is_empty() {
                println!("{}", "No devices attached".yellow());
            } else {
                let rows: Vec<DeviceRow> = devices.into_iter().map(DeviceRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Packages {
            device_id,
            system,
            uninstalled,
        } => {
            let params = json!({
                "token": token,
                "device_id": device_id,
                "include_system": system,
                "uninstalled": uninstalled,
            });

            let result = call_rpc(&url, "adb.packages.v1", params).await?;
            let packages: Vec<PackageRow> = serde_json::from_value(result["packages"].clone())?;

            println!(
                "{}",
                format!("{} packages on {}", packages.len(), device_id).cyan().bold()
            );
            if !packages.is_empty() {
                println!("{}", Table::new(packages));
            }
        }

        Commands::Install { device_id, apk } => {
            // The daemon may run from another working directory
            let apk = std::fs::canonicalize(apk)
                .with_context(|| format!("Cannot access {}", apk.display()))?;
            let params = json!({
                "token": token,
                "device_id": device_id,
                "path": apk.display().to_string(),
            });

            println!("{}", format!("Installing {}...", apk.display()).cyan());
            let result = call_rpc(&url, "adb.install.v1", params).await?;

            println!(
                "{}",
                format!(
                    "✓ Installed on {} in {} ms",
                    device_id, result["duration_ms"]
                )
                .green()
                .bold()
            );
        }

        Commands::Uninstall {
            device_id,
            package,
            keep_data,
            user,
        } => {
            let params = json!({
                "token": token,
                "device_id": device_id,
                "package": package,
                "keep_data": keep_data,
                "user": user,
            });

            call_rpc(&url, "adb.uninstall.v1", params).await?;

            println!(
                "{}",
                format!("✓ {} uninstalled from {}", package, device_id).green().bold()
            );
        }
    }

    Ok(())
}
