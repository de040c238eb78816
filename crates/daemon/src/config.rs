//! Daemon configuration from `ADBRIDGE_*` environment variables

use adbridge_core::application::constants::{DEFAULT_INSTALL_TIMEOUT, DEFAULT_READ_TIMEOUT};
use adbridge_core::AdbConfig;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADB_PATH: &str = "adb";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub adb_path: PathBuf,
    pub read_timeout: Duration,
    pub install_timeout: Duration,
    pub temp_dir: Option<PathBuf>,
    pub rpc_host: String,
    /// None picks a random free port
    pub rpc_port: Option<u16>,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_format = match get("ADBRIDGE_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("ADBRIDGE_LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
        };

        Ok(Self {
            adb_path: get("ADBRIDGE_ADB_PATH")
                .map(|p| expand(&p))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ADB_PATH)),
            read_timeout: seconds(&get, "ADBRIDGE_READ_TIMEOUT_SECS")?.unwrap_or(DEFAULT_READ_TIMEOUT),
            install_timeout: seconds(&get, "ADBRIDGE_INSTALL_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_INSTALL_TIMEOUT),
            temp_dir: get("ADBRIDGE_TEMP_DIR").map(|p| expand(&p)),
            rpc_host: get("ADBRIDGE_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port: parsed::<u16>(&get, "ADBRIDGE_RPC_PORT")?,
            log_format,
            log_dir: get("ADBRIDGE_LOG_DIR").map(|p| expand(&p)),
        })
    }

    /// Client configuration for an already resolved tool path
    pub fn adb_config(&self, tool_path: &Path) -> AdbConfig {
        let config = AdbConfig::new(tool_path)
            .with_read_timeout(self.read_timeout)
            .with_install_timeout(self.install_timeout);
        match &self.temp_dir {
            Some(dir) => config.with_temp_dir(dir.clone()),
            None => config,
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value '{raw}'"))
        })
        .transpose()
}

fn seconds(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    match parsed::<u64>(get, key)? {
        Some(0) => bail!("{key} must be greater than zero"),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}
