// src/server/mod.rs

//! HTTP boundary for the catalog service.
//!
//! Wires the catalog, scraper, auth, and metrics components into an axum
//! router and runs it with graceful shutdown.

pub mod auth;
pub mod error;
pub mod metrics;
pub mod routes;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::{Catalog, CatalogCache, DatasetLoader};
use crate::error::Result;
use crate::models::Config;
use crate::scraper::BookScraper;
use crate::storage::DatasetStore;

use auth::AuthService;
use metrics::Metrics;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<DatasetStore>,
    pub scraper: Arc<BookScraper>,
    pub auth: Arc<AuthService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Build the full component stack from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = DatasetStore::from_config(&config.catalog);
        let loader = DatasetLoader::new(store.clone());
        let cache = CatalogCache::new(Arc::new(loader), config.catalog.cache_ttl());

        Ok(Self {
            catalog: Arc::new(Catalog::new(cache)),
            store: Arc::new(store),
            scraper: Arc::new(BookScraper::new(&config.scraper)?),
            auth: Arc::new(AuthService::from_config(&config.auth)),
            metrics: Arc::new(Metrics::default()),
        })
    }
}

/// Build the API router.
pub fn router(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/auth/login", post(routes::login))
        .route("/auth/refresh", post(routes::refresh))
        .route("/books", get(routes::list_books))
        .route("/books/search", get(routes::search_books))
        .route("/books/top-rated", get(routes::top_rated_books))
        .route("/books/price-range", get(routes::books_in_price_range))
        .route("/books/:book_id", get(routes::get_book))
        .route("/categories", get(routes::list_categories))
        .route("/stats/overview", get(routes::stats_overview))
        .route("/stats/categories", get(routes::stats_categories))
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/ml/features", get(routes::ml_features))
        .route("/ml/training-data", get(routes::ml_training_data))
        .route("/ml/predictions", post(routes::predict))
        .route("/scraping/trigger", post(routes::trigger_scraping))
        .route("/scraping/reload", post(routes::reload_data));

    Router::new()
        .route("/", get(routes::root))
        .nest("/api/v1", api)
        .layer(cors_layer(&config.server.allowed_origins))
        .layer(middleware::from_fn_with_state(state.clone(), metrics::track))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

/// Run the API server until interrupted.
pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;

    // Warm the cache so startup logs report the catalog size
    let health = state.catalog.health().await;
    if health.connected {
        tracing::info!("Catalog loaded with {} books", health.total_books);
    } else {
        tracing::warn!(
            "Catalog is empty; run the scraper or POST /api/v1/scraping/trigger"
        );
    }

    let app = router(state, &config);
    let address = config.server.bind_addr();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        tracing::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
