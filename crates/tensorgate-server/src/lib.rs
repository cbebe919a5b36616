//! HTTP edge for the tensorgate gateway.
//!
//! Every inbound request enters the router: `/auth/*` paths run the OAuth
//! login flow and session endpoints, everything else is forwarded to the
//! upstream API (with a session check for `/api/` paths). Every response
//! passes through the CORS policy on the way out.
//!
//! # Example
//!
//! ```ignore
//! use tensorgate_server::{Gateway, GatewayConfig};
//!
//! let config = GatewayConfig::from_env()?;
//! Gateway::new(config).run().await?;
//! ```

pub mod config;
pub mod cors;
pub mod error;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use cors::CorsPolicy;
pub use error::{Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The gateway HTTP server.
pub struct Gateway {
    state: AppState,
}

impl Gateway {
    /// Create a gateway from configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }

    /// Create a gateway from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .route("/auth/login", get(routes::auth::login))
            .route("/auth/github", get(routes::auth::github))
            .route("/auth/callback", get(routes::auth::callback))
            .route("/auth/verify", get(routes::auth::verify))
            .route("/auth/logout", get(routes::auth::logout))
            // Everything else goes to the upstream API.
            .fallback(routes::proxy::forward)
            // CORS headers on every response, preflight short-circuit included.
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                cors::cors_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the gateway.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config().bind_address;
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("failed to bind {addr}: {e}")))?;
        info!(addr = %addr, "starting gateway");

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("server error: {e}")))
    }

    /// Run with graceful shutdown, returning the bound address.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.state.config().bind_address).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "starting gateway");
        tokio::spawn(async move {
            axum::serve(listener, self.router())
                .with_graceful_shutdown(shutdown)
                .await
                .ok();
        });
        Ok(local_addr)
    }
}
