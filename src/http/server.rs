//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with public and admin routes
//! - Wire up middleware (tracing)
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::assets::AssetStore;
use crate::cache::MemoryCache;
use crate::config::{ConfigStore, ReloadCoordinator};
use crate::http::handlers::healthz;
use crate::i18n::LocaleStore;
use crate::lifecycle::App;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: ConfigStore,
    pub locales: LocaleStore,
    pub assets: AssetStore,
    pub cache: MemoryCache,
    pub coordinator: Arc<ReloadCoordinator>,
    pub started_at: Instant,
}

impl From<&App> for AppState {
    fn from(app: &App) -> Self {
        Self {
            store: app.store.clone(),
            locales: app.locales.clone(),
            assets: app.assets.clone(),
            cache: app.cache.clone(),
            coordinator: app.coordinator.clone(),
            started_at: Instant::now(),
        }
    }
}

pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .with_state(state.clone())
            .merge(setup_admin_router(state))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
