//! Spam, risk, and rate-limit endpoints used by submission workflows.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hangar_common::constants::headers::X_RATELIMIT_REMAINING;
use hangar_common::{GuardError, RiskSubject, SpamReport};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ApiError, client_ip};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SpamCheckRequest {
    content: String,
    author_id: String,
}

/// Score a submission, then add it to the author's history
pub async fn check_spam(
    State(state): State<AppState>,
    Json(payload): Json<SpamCheckRequest>,
) -> Result<Json<SpamReport>, ApiError> {
    if payload.author_id.trim().is_empty() {
        return Err(GuardError::InvalidInput("author_id is required".to_string()).into());
    }

    let report = state
        .spam_checker
        .check_spam_content(&payload.content, &payload.author_id)
        .await;
    state
        .spam_checker
        .record(&payload.author_id, &payload.content)
        .await;

    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct RiskScoreRequest {
    #[serde(default)]
    user: RiskSubject,
    /// Defaults to the requesting client's address
    #[serde(default)]
    ip: Option<String>,
}

#[derive(Serialize)]
pub struct RiskScoreResponse {
    score: u8,
}

pub async fn score_risk(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RiskScoreRequest>,
) -> Json<RiskScoreResponse> {
    let ip = payload.ip.or_else(|| client_ip(&headers));
    let score = state.risk_scorer.score(&payload.user, ip.as_deref());
    Json(RiskScoreResponse { score })
}

#[derive(Deserialize)]
pub struct RateLimitRequest {
    key: String,
    /// Defaults to `rate_limit.max_requests`
    limit: Option<u32>,
    /// Defaults to `rate_limit.window_secs`
    window_secs: Option<u64>,
}

/// Count one action against a caller-chosen key
pub async fn check_rate_limit(
    State(state): State<AppState>,
    Json(payload): Json<RateLimitRequest>,
) -> Result<Response, ApiError> {
    let limit = payload.limit.unwrap_or(state.config.rate_limit.max_requests);
    let window = payload
        .window_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.config.rate_limit.window());

    if payload.key.is_empty() || limit == 0 || window.is_zero() {
        return Err(GuardError::InvalidInput(
            "key, limit and window must be non-empty".to_string(),
        )
        .into());
    }

    let outcome = state.throttle(&payload.key, limit, window).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };

    Ok((
        status,
        [(X_RATELIMIT_REMAINING, outcome.remaining.to_string())],
        Json(outcome),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::super::tests::{app, call, json_post};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_spam_check_records_history() {
        let app = app();
        let body = json!({ "author_id": "u1", "content": "my first gunpla, an hg zaku ii in green" });

        let (status, _, report) = call(app.clone(), json_post("/spam/check", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["score"], 0.0);

        let (_, _, report) = call(app, json_post("/spam/check", body)).await;
        assert_eq!(report["reasons"][0], "near-duplicate of recent content");
    }

    #[tokio::test]
    async fn test_spam_check_requires_author() {
        let body = json!({ "author_id": " ", "content": "hello" });
        let (status, _, _) = call(app(), json_post("/spam/check", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_risk_score_uses_client_ip_default() {
        let body = json!({
            "user": { "created_at": "2000-01-01T00:00:00Z", "email_verified": true, "reputation": 50 }
        });
        let (status, _, response) = call(app(), json_post("/risk/score", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["score"], 0);

        let (_, _, response) = call(app(), json_post("/risk/score", json!({}))).await;
        assert_eq!(response["score"], 75);
    }

    #[tokio::test]
    async fn test_rate_limit_check() {
        let app = app();
        let body = json!({ "key": "comment:u1", "limit": 1, "window_secs": 60 });

        let (status, headers, outcome) = call(app.clone(), json_post("/ratelimit/check", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome, json!({ "success": true, "remaining": 0 }));
        assert_eq!(headers["x-ratelimit-remaining"], "0");

        let (status, _, outcome) = call(app.clone(), json_post("/ratelimit/check", body)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(outcome["success"], false);

        let bad = json!({ "key": "", "limit": 1 });
        let (status, _, _) = call(app, json_post("/ratelimit/check", bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
