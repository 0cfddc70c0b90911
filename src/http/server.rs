//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the page, the JSON API and the event stream
//! - Wire up middleware (request ID, tracing, timeouts, metrics)
//! - Serve until the shutdown signal fires

use axum::body::Body;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::blockchain::TokenLedger;
use crate::config::MinterConfig;
use crate::http::request::track_metrics;
use crate::http::{events, handlers};
use crate::lifecycle::{Services, Shutdown};
use crate::minting::Minter;
use crate::observability::tracing::request_span;

/// Largest request body accepted; forms and wallet keys are tiny.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub minter: Arc<Minter>,
    pub ledger: Arc<dyn TokenLedger>,
    pub shutdown: Shutdown,
}

/// HTTP server for the minter.
pub struct HttpServer {
    router: Router,
    config: MinterConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    pub fn new(config: MinterConfig, services: Services, shutdown: Shutdown) -> Self {
        let state = AppState {
            minter: services.minter,
            ledger: services.ledger,
            shutdown: shutdown.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout does not apply to the event stream.
    #[allow(deprecated)]
    fn build_router(config: &MinterConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route("/api/wallet", get(handlers::wallet))
            .route("/api/wallet/connect", post(handlers::connect_wallet))
            .route("/api/wallet/disconnect", post(handlers::disconnect_wallet))
            .route("/api/mint", post(handlers::start_mint))
            .route("/api/mint/check", post(handlers::check_form))
            .route("/api/status", get(handlers::status))
            .route(
                "/api/checkpoint",
                get(handlers::checkpoint).delete(handlers::abandon),
            )
            .route("/api/authority", get(handlers::authority))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

        api.route("/api/events", get(events::stream))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Router with state applied, for serving on a custom listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut shutdown = self.shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MinterConfig {
        &self.config
    }
}
