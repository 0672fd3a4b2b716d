//! Core server-related functionality.

use crate::config::WebConfig;
use crate::request_scope::with_request_scope;
use axum::Router;
use hyper::Error as HyperError;
use scopeline::runner::ApplicationRunner;
use scopeline_di::container::Container;
use scopeline_di::instance_provider::ErrorPtr;
use std::future::{self, Future};
use std::io::Error as IoError;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{info, warn};

/// Errors related to bootstrapping and running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Error parsing listen address: {0}")]
    ListenAddressParseError(AddrParseError),
    #[error("Error binding server: {0}")]
    BindError(#[source] HyperError),
    #[error("Error creating async runtime: {0}")]
    RuntimeError(#[source] IoError),
    #[error("Server error: {0}")]
    ServeError(#[source] HyperError),
}

/// [ApplicationRunner] serving given router with request scopes created from the application
/// container. The server runs on its own async runtime until ctrl-c is received, therefore the
/// application must not be run from within another async runtime.
#[derive(Clone, Debug)]
pub struct ServerRunner {
    router: Router,
    config: WebConfig,
}

impl ServerRunner {
    pub fn new(router: Router, config: WebConfig) -> Self {
        Self { router, config }
    }

    /// Creates a runner with config read from the default config file.
    pub fn create_default(router: Router) -> Result<Self, ErrorPtr> {
        WebConfig::init_from_config().map(|config| Self::new(router, config))
    }

    /// Serves requests until the shutdown signal completes.
    pub async fn serve<F>(&self, container: Container, shutdown_signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listen_address: SocketAddr = self
            .config
            .listen_address
            .parse()
            .map_err(ServerError::ListenAddressParseError)?;

        let router = with_request_scope(self.router.clone(), container);
        let server = axum::Server::try_bind(&listen_address).map_err(ServerError::BindError)?;

        info!(%listen_address, "Starting server...");

        server
            .serve(router.into_make_service())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(ServerError::ServeError)
    }
}

impl ApplicationRunner for ServerRunner {
    fn run(&self, container: &Container) -> Result<(), ErrorPtr> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(ServerError::RuntimeError)
            .map_err(|error| Arc::new(error) as ErrorPtr)?;

        runtime
            .block_on(self.serve(container.clone(), ctrl_c()))
            .map_err(|error| Arc::new(error) as ErrorPtr)
    }
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down server..."),
        Err(error) => {
            warn!(%error, "Cannot listen for ctrl-c - the server needs to be stopped externally");
            future::pending::<()>().await;
        }
    }
}
