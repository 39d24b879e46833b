//! HTTP route handlers for Guard.

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use hangar_common::GuardError;
use hangar_common::constants::headers::{X_FORWARDED_FOR, X_RATELIMIT_REMAINING, X_REAL_IP};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod captcha;
mod health;
mod moderation;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // CAPTCHA endpoints
        .route("/captcha/challenge", get(captcha::get_challenge))
        .route("/captcha/verify", post(captcha::verify_challenge))

        // Scoring for submission and report workflows
        .route("/spam/check", post(moderation::check_spam))
        .route("/risk/score", post(moderation::score_risk))
        .route("/ratelimit/check", post(moderation::check_rate_limit))

        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Client address from the proxy headers, first hop wins
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded.or_else(real_ip).map(str::to_string)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// 429 with an empty remaining budget
pub(crate) fn rate_limited() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(X_RATELIMIT_REMAINING, "0")],
        Json(ErrorBody {
            error: "Too many requests".to_string(),
        }),
    )
        .into_response()
}

/// Service fault surfaced to the client
pub(crate) struct ApiError(pub GuardError);

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
