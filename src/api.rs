//! HTTP surface consumed by the risk dashboard frontend.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::assessment::{ClubRisk, RiskService, ServiceStatus};
use crate::config::ServiceConfig;

pub type SharedService = Arc<RiskService>;

/// Body of `POST /api/risk`.
#[derive(Debug, Deserialize)]
pub struct RiskRequest {
    pub club_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RiskResponse {
    pub clubs: Vec<ClubRisk>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("risk assessment failed: {0:#}")]
    Assessment(anyhow::Error),
    #[error("risk worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let body = serde_json::json!({ "detail": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub fn router(service: SharedService, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/risk", post(post_risk))
        .route("/api/clubs", get(get_clubs))
        .route("/health", get(health))
        .with_state(service)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(config: &ServiceConfig, service: SharedService) -> anyhow::Result<()> {
    let app = router(service, &config.allowed_origins);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("risk API listening on {}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// Credentials are allowed, so origins must be listed explicitly and methods
/// and headers are mirrored rather than wildcarded.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let mut allowed = Vec::with_capacity(origins.len());
    for origin in origins {
        if origin == "*" {
            warn!("ignoring wildcard CORS origin; credentials require explicit origins");
            continue;
        }
        match HeaderValue::from_str(origin) {
            Ok(value) => allowed.push(value),
            Err(_) => warn!(origin = %origin, "ignoring invalid CORS origin"),
        }
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn post_risk(
    State(service): State<SharedService>,
    Json(req): Json<RiskRequest>,
) -> Result<Json<RiskResponse>, ApiError> {
    debug!(clubs = ?req.club_names, "risk request");
    let clubs = tokio::task::spawn_blocking(move || service.assess(&req.club_names))
        .await?
        .map_err(ApiError::Assessment)?;
    Ok(Json(RiskResponse { clubs }))
}

async fn get_clubs(State(service): State<SharedService>) -> Json<Vec<String>> {
    Json(service.club_names())
}

async fn health(State(service): State<SharedService>) -> Json<ServiceStatus> {
    Json(service.status())
}
