//! clinicgate HTTP server
//!
//! Wires the authenticator, access gate and patient service into an axum
//! router and serves it over TCP.

mod error;
pub mod http;

pub use error::ApiError;
pub use http::create_router;

use crate::auth::{Authenticator, PasswordHasher, TokenCodec};
use crate::config::ServerConfig;
use crate::records::PatientService;
use crate::storage::{AccountStore, PatientStore};

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Authenticator,
    pub patients: PatientService,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        accounts: Arc<dyn AccountStore>,
        patients: Arc<dyn PatientStore>,
    ) -> Result<Self> {
        config.auth.validate().context("Invalid auth configuration")?;

        let hasher = Arc::new(
            PasswordHasher::new(&config.auth).context("Failed to build password hasher")?,
        );
        let codec = Arc::new(TokenCodec::from_config(&config.auth));

        Ok(Self {
            auth: Authenticator::new(accounts, hasher, codec.clone()),
            patients: PatientService::new(patients),
            codec,
        })
    }
}

/// The main clinicgate server
pub struct ClinicServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl ClinicServer {
    pub fn new(
        config: ServerConfig,
        accounts: Arc<dyn AccountStore>,
        patients: Arc<dyn PatientStore>,
    ) -> Result<Self> {
        let state = AppState::new(&config, accounts, patients)?;
        Ok(Self {
            bind_addr: config.bind_addr,
            state,
        })
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_addr))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = listener.local_addr()?;
        let app = self.router();

        info!(addr = %addr, "clinicgate server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        info!("clinicgate server stopped");
        Ok(())
    }
}
