use std::sync::{Arc, Mutex};

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, rejection::QueryRejection, FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tutora_shared::PageInfo;
use tutora_store::Database;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::notify::Notifier;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::rooms::RoomSignaling;

mod auth;
mod availability;
mod bookings;
mod rooms;
mod teachers;
mod users;

#[cfg(test)]
mod tests;

pub use auth::bootstrap_admin;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
    pub notifier: Notifier,
    pub rooms: Arc<dyn RoomSignaling>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ServerConfig,
        notifier: Notifier,
        rooms: Arc<dyn RoomSignaling>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            notifier,
            rooms,
            rate_limiter,
        }
    }

    /// Run `f` with exclusive access to the database. The lock is released
    /// before this returns, so callers never hold it across an `.await`.
    pub fn with_db<T>(
        &self,
        f: impl FnOnce(&mut Database) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut db = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        f(&mut db)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/auth", auth::routes())
        .nest("/api/teachers", teachers::routes())
        .nest("/api/availability", availability::routes())
        .nest("/api/bookings", bookings::routes())
        .nest("/api/users", users::routes())
        .nest("/api/rooms", rooms::routes())
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match config
        .client_url
        .as_deref()
        .and_then(|url| HeaderValue::from_str(url).ok())
    {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data,
        pagination: None,
    }))
}

pub fn paged<T: Serialize>(data: T, pagination: PageInfo) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data,
        pagination: Some(pagination),
    }))
}

pub fn created<T: Serialize>(data: T) -> Result<(StatusCode, Json<Envelope<T>>), ApiError> {
    ok(data).map(|json| (StatusCode::CREATED, json))
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// `Json` whose rejection is rendered in the API's error format.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|e: JsonRejection| ApiError::BadRequest(e.body_text()))
    }
}

/// `Query` whose rejection is rendered in the API's error format.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|e: QueryRejection| ApiError::BadRequest(e.body_text()))
    }
}

/// Query-string value where a blank (`?minRating=`) counts as absent.
/// Use with `#[serde(default, deserialize_with = "blank_as_none")]`.
pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse a path id; a malformed id names nothing, so it is a 404.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(what))
}

// ---------------------------------------------------------------------------
// Misc handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
