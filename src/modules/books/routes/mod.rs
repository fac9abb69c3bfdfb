//! HTTP handlers for the books module.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use bookshelf_http::{ApiResponse, AppError};

use super::models::{Book, BookQuery, CreateBook, CreateReview, Review, SimulateOutage};
use super::service::{CacheStatus, CatalogService};

type Shared = Arc<CatalogService>;

pub fn router(service: Shared) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/cache", get(cache_status))
        .route("/cache/outage", post(simulate_outage))
        .route("/{id}", get(get_book))
        .route("/{id}/reviews", get(list_reviews).post(create_review))
        .with_state(service)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(service): State<Shared>,
    Query(query): Query<BookQuery>,
) -> Result<ApiResponse<Vec<Book>>, AppError> {
    Ok(service.list_books(query.q.as_deref()).await?)
}

async fn create_book(
    State(service): State<Shared>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<ApiResponse<Book>, AppError> {
    let Json(request) = payload?;
    Ok(service.create_book(request).await?)
}

async fn get_book(
    State(service): State<Shared>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Book>, AppError> {
    Ok(service.get_book(&id).await?)
}

async fn list_reviews(
    State(service): State<Shared>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Vec<Review>>, AppError> {
    Ok(service.list_reviews(&id).await?)
}

async fn create_review(
    State(service): State<Shared>,
    Path(id): Path<String>,
    payload: Result<Json<CreateReview>, JsonRejection>,
) -> Result<ApiResponse<Review>, AppError> {
    let Json(request) = payload?;
    Ok(service.create_review(&id, request).await?)
}

async fn cache_status(State(service): State<Shared>) -> ApiResponse<CacheStatus> {
    ApiResponse::ok(service.cache_status(), "Cache status retrieved")
}

/// Body is optional; an empty request uses the configured outage length.
async fn simulate_outage(
    State(service): State<Shared>,
    body: Result<Option<Json<SimulateOutage>>, JsonRejection>,
) -> Result<ApiResponse<CacheStatus>, AppError> {
    let duration = body?
        .and_then(|Json(request)| request.duration_ms)
        .map(Duration::from_millis);
    Ok(service.simulate_cache_outage(duration))
}
