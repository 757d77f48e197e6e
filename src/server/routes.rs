//! API route handlers.
//!
//! Handlers validate request ranges here at the boundary — the catalog core
//! assumes validated inputs and never errors on its read path.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{CategoryStats, FeatureSet, OverviewStats, Prediction, SearchFilter, TrainingData};
use crate::models::BookRecord;
use crate::server::AppState;
use crate::server::auth::AdminUser;
use crate::server::error::ApiError;
use crate::server::metrics::MetricsSnapshot;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ---- Root ----

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub health: &'static str,
}

/// GET /
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Bookcase API",
        version: env!("CARGO_PKG_VERSION"),
        health: "/api/v1/health",
    })
}

// ---- Authentication ----

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let user = state
        .auth
        .authenticate(&request.username, &request.password)
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?
        .clone();

    Ok(Json(TokenResponse {
        access_token: state.auth.issue_access_token(&user)?,
        refresh_token: state.auth.issue_refresh_token(&user)?,
        token_type: "bearer",
        expires_in: state.auth.access_expires_in(),
    }))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<TokenResponse> {
    let claims = state
        .auth
        .verify(&request.refresh_token, crate::server::auth::TOKEN_REFRESH)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    let user = state
        .auth
        .user(&claims.sub)
        .ok_or_else(|| ApiError::unauthorized("unknown user"))?
        .clone();

    Ok(Json(TokenResponse {
        access_token: state.auth.issue_access_token(&user)?,
        refresh_token: state.auth.issue_refresh_token(&user)?,
        token_type: "bearer",
        expires_in: state.auth.access_expires_in(),
    }))
}

// ---- Books ----

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /api/v1/books
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<BookRecord>> {
    let limit = query.limit.unwrap_or(100);
    let offset = query.offset.unwrap_or(0);
    if !(1..=1000).contains(&limit) {
        return Err(ApiError::bad_request("limit must be in 1..=1000"));
    }

    Ok(Json(state.catalog.list_books(limit, offset).await))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub category: Option<String>,
    pub min_rating: Option<u8>,
    pub max_price: Option<f64>,
}

/// GET /api/v1/books/search
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<BookRecord>> {
    if let Some(min_rating) = query.min_rating {
        if min_rating > 5 {
            return Err(ApiError::bad_request("min_rating must be in 0..=5"));
        }
    }
    if let Some(max_price) = query.max_price {
        if max_price < 0.0 {
            return Err(ApiError::bad_request("max_price must be >= 0"));
        }
    }

    let filter = SearchFilter {
        title: query.title.filter(|t| !t.is_empty()),
        category: query.category.filter(|c| !c.is_empty()),
        min_rating: query.min_rating,
        max_price: query.max_price,
    };
    Ok(Json(state.catalog.search_books(&filter).await))
}

#[derive(Debug, Deserialize)]
pub struct TopRatedQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/books/top-rated
pub async fn top_rated_books(
    State(state): State<AppState>,
    Query(query): Query<TopRatedQuery>,
) -> ApiResult<Vec<BookRecord>> {
    let limit = query.limit.unwrap_or(10);
    if !(1..=100).contains(&limit) {
        return Err(ApiError::bad_request("limit must be in 1..=100"));
    }

    Ok(Json(state.catalog.top_rated_books(limit).await))
}

#[derive(Debug, Deserialize)]
pub struct PriceRangeQuery {
    pub min: f64,
    pub max: f64,
}

/// GET /api/v1/books/price-range
pub async fn books_in_price_range(
    State(state): State<AppState>,
    Query(query): Query<PriceRangeQuery>,
) -> ApiResult<Vec<BookRecord>> {
    if query.min < 0.0 || query.max < 0.0 {
        return Err(ApiError::bad_request("prices must be >= 0"));
    }
    if query.min > query.max {
        return Err(ApiError::bad_request(
            "minimum price cannot exceed maximum price",
        ));
    }

    Ok(Json(
        state.catalog.books_in_price_range(query.min, query.max).await,
    ))
}

/// GET /api/v1/books/:id
pub async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<u32>,
) -> ApiResult<BookRecord> {
    state
        .catalog
        .get_book(book_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("book {book_id} not found")))
}

// ---- Categories ----

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub total: usize,
    pub categories: Vec<String>,
}

/// GET /api/v1/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<CategoriesResponse> {
    let categories = state.catalog.list_categories().await;
    Ok(Json(CategoriesResponse {
        total: categories.len(),
        categories,
    }))
}

// ---- Statistics ----

/// GET /api/v1/stats/overview
pub async fn stats_overview(State(state): State<AppState>) -> ApiResult<OverviewStats> {
    Ok(Json(state.catalog.overview_stats().await))
}

#[derive(Debug, Serialize)]
pub struct CategoryStatsResponse {
    pub total_categories: usize,
    pub stats: Vec<CategoryStats>,
}

/// GET /api/v1/stats/categories
pub async fn stats_categories(State(state): State<AppState>) -> ApiResult<CategoryStatsResponse> {
    let stats = state.catalog.category_stats().await;
    Ok(Json(CategoryStatsResponse {
        total_categories: stats.len(),
        stats,
    }))
}

// ---- Health ----

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub total_books: usize,
    pub file_path: String,
    pub file_exists: bool,
    pub cache_valid: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
}

/// GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let health = state.catalog.health().await;
    let dataset_path = state.store.dataset_path();
    let file_exists = tokio::fs::try_exists(&dataset_path).await.unwrap_or(false);

    Ok(Json(HealthResponse {
        status: if health.connected {
            "healthy"
        } else {
            "unhealthy"
        },
        timestamp: Utc::now(),
        database: DatabaseHealth {
            connected: health.connected,
            total_books: health.total_books,
            file_path: dataset_path.display().to_string(),
            file_exists,
            cache_valid: health.cache_valid,
        },
    }))
}

// ---- Monitoring ----

/// GET /api/v1/metrics
pub async fn metrics(State(state): State<AppState>) -> ApiResult<MetricsSnapshot> {
    Ok(Json(state.metrics.snapshot()))
}

// ---- Machine learning ----

/// GET /api/v1/ml/features
pub async fn ml_features(State(state): State<AppState>) -> ApiResult<FeatureSet> {
    Ok(Json(state.catalog.ml_features().await))
}

/// GET /api/v1/ml/training-data
pub async fn ml_training_data(State(state): State<AppState>) -> ApiResult<TrainingData> {
    Ok(Json(state.catalog.ml_training_data().await))
}

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub title: String,
    pub price: f64,
    pub category: String,
}

/// POST /api/v1/ml/predictions
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<Prediction> {
    if request.price < 0.0 {
        return Err(ApiError::bad_request("price must be >= 0"));
    }
    if request.title.is_empty() || request.category.is_empty() {
        return Err(ApiError::bad_request("title and category are required"));
    }

    Ok(Json(
        state
            .catalog
            .predict(&request.title, request.price, &request.category)
            .await,
    ))
}

// ---- Admin ----

#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    pub max_pages: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub message: String,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/scraping/trigger
pub async fn trigger_scraping(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<TriggerQuery>,
) -> ApiResult<ScrapeResponse> {
    let max_pages = query.max_pages.unwrap_or(3);
    if !(1..=50).contains(&max_pages) {
        return Err(ApiError::bad_request("max_pages must be in 1..=50"));
    }

    tracing::info!("Scraping triggered by {}", user.username);
    let outcome = state
        .scraper
        .scrape_all(max_pages)
        .await
        .map_err(|e| ApiError::internal(format!("scrape failed: {e}")))?;
    state
        .store
        .save_rows(outcome.books)
        .await
        .map_err(|e| ApiError::internal(format!("failed to persist dataset: {e}")))?;

    let count = state.catalog.reload().await;
    Ok(Json(ScrapeResponse {
        message: format!("Scraping finished; {count} books loaded"),
        status: "success",
        timestamp: Utc::now(),
    }))
}

/// POST /api/v1/scraping/reload
pub async fn reload_data(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
) -> ApiResult<ScrapeResponse> {
    tracing::info!("Dataset reload requested by {}", user.username);
    let count = state.catalog.reload().await;

    Ok(Json(ScrapeResponse {
        message: format!("Dataset reloaded; {count} books"),
        status: "success",
        timestamp: Utc::now(),
    }))
}
