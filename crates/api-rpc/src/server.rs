//! JSON-RPC Server
//!
//! Serves the device-bridge methods over TCP on localhost.

use crate::handler::RpcHandler;
use crate::session::SessionState;
use crate::types::{InstallRequest, PackagesRequest, TokenRequest, UninstallRequest};
use adbridge_core::AdbClient;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to build server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register method: {0}")]
    Register(String),
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 lets the OS pick
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: 0,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, client: Arc<AdbClient>, session: Arc<SessionState>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(client, session)),
        }
    }

    /// Start the JSON-RPC server, returning the bound address
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = server.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let module = self.module()?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        Ok((local_addr, server.start(module)))
    }

    fn module(&self) -> Result<RpcModule<()>, ServerError> {
        let mut module = RpcModule::new(());

        // Session
        let handler = self.handler.clone();
        module
            .register_async_method("health.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.health().await }
            })
            .map_err(register_err)?;

        let handler = self.handler.clone();
        module
            .register_async_method("pair.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.pair().await }
            })
            .map_err(register_err)?;

        // Device bridge
        let handler = self.handler.clone();
        module
            .register_async_method("adb.version.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: TokenRequest = params.parse()?;
                    handler.version(req).await
                }
            })
            .map_err(register_err)?;

        let handler = self.handler.clone();
        module
            .register_async_method("adb.devices.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: TokenRequest = params.parse()?;
                    handler.devices(req).await
                }
            })
            .map_err(register_err)?;

        let handler = self.handler.clone();
        module
            .register_async_method("adb.packages.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: PackagesRequest = params.parse()?;
                    handler.packages(req).await
                }
            })
            .map_err(register_err)?;

        let handler = self.handler.clone();
        module
            .register_async_method("adb.install.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: InstallRequest = params.parse()?;
                    handler.install(req).await
                }
            })
            .map_err(register_err)?;

        let handler = self.handler.clone();
        module
            .register_async_method("adb.uninstall.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: UninstallRequest = params.parse()?;
                    handler.uninstall(req).await
                }
            })
            .map_err(register_err)?;

        Ok(module)
    }
}

fn register_err(e: impl std::fmt::Display) -> ServerError {
    ServerError::Register(e.to_string())
}
