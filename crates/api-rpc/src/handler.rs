//! RPC Method Handlers
//!
//! Each device method authorizes the token, then calls the client with a
//! fresh call context. If the transport drops the request future, the
//! running adb process is killed with it.

use crate::error::to_rpc_error;
use crate::session::SessionState;
use crate::types::{
    DevicesResponse, HealthResponse, InstallRequest, InstallResponse, PackagesRequest,
    PackagesResponse, PairResponse, TokenRequest, UninstallRequest, UninstallResponse,
    VersionResponse,
};
use adbridge_core::domain::ListPackageOptions;
use adbridge_core::{AdbClient, CallContext};
use chrono::{DateTime, Utc};
use jsonrpsee::types::ErrorObjectOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    client: Arc<AdbClient>,
    session: Arc<SessionState>,
    start_time: std::time::Instant,
    started_at: DateTime<Utc>,
}

impl RpcHandler {
    pub fn new(client: Arc<AdbClient>, session: Arc<SessionState>) -> Self {
        Self {
            client,
            session,
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
        }
    }

    fn authorize(&self, token: &str) -> Result<(), ErrorObjectOwned> {
        self.session.authorize(token).map_err(to_rpc_error)
    }

    /// health.v1
    pub async fn health(&self) -> Result<HealthResponse, ErrorObjectOwned> {
        Ok(HealthResponse {
            status: "ok".to_string(),
            version: adbridge_core::VERSION.to_string(),
            paired: self.session.is_paired(),
            started_at: self.started_at,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }

    /// pair.v1
    pub async fn pair(&self) -> Result<PairResponse, ErrorObjectOwned> {
        let token = self.session.pair().map_err(to_rpc_error)?;
        Ok(PairResponse { token })
    }

    /// adb.version.v1
    pub async fn version(&self, params: TokenRequest) -> Result<VersionResponse, ErrorObjectOwned> {
        self.authorize(&params.token)?;

        let version = self
            .client
            .version(&CallContext::background())
            .await
            .map_err(|e| to_rpc_error(e.into()))?;

        Ok(VersionResponse { version })
    }

    /// adb.devices.v1
    pub async fn devices(&self, params: TokenRequest) -> Result<DevicesResponse, ErrorObjectOwned> {
        self.authorize(&params.token)?;

        let devices = self
            .client
            .devices(&CallContext::background())
            .await
            .map_err(|e| to_rpc_error(e.into()))?;

        Ok(DevicesResponse { devices })
    }

    /// adb.packages.v1
    pub async fn packages(
        &self,
        params: PackagesRequest,
    ) -> Result<PackagesResponse, ErrorObjectOwned> {
        self.authorize(&params.token)?;

        let options = ListPackageOptions {
            include_system: params.include_system,
            include_uninstalled: params.uninstalled,
        };
        let packages = self
            .client
            .packages(&CallContext::background(), &params.device_id, options)
            .await
            .map_err(|e| to_rpc_error(e.into()))?;

        Ok(PackagesResponse {
            device_id: params.device_id,
            packages,
        })
    }

    /// adb.install.v1
    pub async fn install(&self, params: InstallRequest) -> Result<InstallResponse, ErrorObjectOwned> {
        self.authorize(&params.token)?;

        let path = PathBuf::from(shellexpand::tilde(&params.path).into_owned());
        let started = std::time::Instant::now();
        self.client
            .install(&CallContext::background(), &params.device_id, &path)
            .await
            .map_err(|e| to_rpc_error(e.into()))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(serial = %params.device_id, path = %path.display(), duration_ms, "Install request completed");

        Ok(InstallResponse {
            device_id: params.device_id,
            installed: true,
            duration_ms,
        })
    }

    /// adb.uninstall.v1
    pub async fn uninstall(
        &self,
        params: UninstallRequest,
    ) -> Result<UninstallResponse, ErrorObjectOwned> {
        self.authorize(&params.token)?;

        self.client
            .uninstall(
                &CallContext::background(),
                &params.device_id,
                &params.package,
                params.keep_data,
                params.user,
            )
            .await
            .map_err(|e| to_rpc_error(e.into()))?;

        Ok(UninstallResponse {
            device_id: params.device_id,
            package: params.package,
            uninstalled: true,
        })
    }
}
