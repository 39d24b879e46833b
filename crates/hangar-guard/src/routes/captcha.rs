//! CAPTCHA generation and verification endpoints.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hangar_common::CaptchaVerdict;
use hangar_common::constants::headers::X_RATELIMIT_REMAINING;
use serde::Deserialize;

use super::{ApiError, client_ip, rate_limited};
use crate::state::AppState;

/// Generate a new CAPTCHA challenge, limited per client IP
pub async fn get_challenge(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    let captcha = &state.config.captcha;

    let outcome = state
        .throttle(
            &format!("captcha-generate:{ip}"),
            captcha.generate_limit,
            captcha.generate_window(),
        )
        .await;
    if !outcome.success {
        tracing::info!(client_ip = %ip, "CAPTCHA generation rate limited");
        return Ok(rate_limited());
    }

    let challenge = state
        .captcha_generator
        .generate(&state.challenges, captcha.difficulty)
        .await?;

    Ok((
        [(X_RATELIMIT_REMAINING, outcome.remaining.to_string())],
        Json(challenge),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    challenge_id: String,
    /// Option id the user picked
    selected: String,
}

/// Verify a CAPTCHA response
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<CaptchaVerdict>), ApiError> {
    let verdict = state
        .captcha_verifier
        .verify(&state.challenges, &payload.challenge_id, &payload.selected)
        .await?;

    let status = if verdict.valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(verdict)))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, json_post};
    use super::*;
    use crate::config::AppConfig;
    use crate::routes::create_router;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;

    fn challenge_request() -> Request<Body> {
        Request::get("/captcha/challenge")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_challenge_generation_is_rate_limited() {
        let mut config = AppConfig::default();
        config.captcha.generate_limit = 2;
        let app = create_router(AppState::in_memory(config));

        let (status, headers, body) = call(app.clone(), challenge_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[X_RATELIMIT_REMAINING], "1");
        assert!(body["image_data"].as_str().unwrap().starts_with("data:image/png"));
        assert_eq!(body["options"].as_array().unwrap().len(), 6);

        let (status, _, _) = call(app.clone(), challenge_request()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, _) = call(app, challenge_request()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(headers[X_RATELIMIT_REMAINING], "0");
    }

    #[tokio::test]
    async fn test_verify_then_replay() {
        let state = AppState::in_memory(AppConfig::default());
        let app = create_router(state.clone());
        let (challenge, answer) = state
            .captcha_generator
            .issue(&state.challenges, state.config.captcha.difficulty)
            .await
            .unwrap();

        let body = json!({ "challenge_id": challenge.challenge_id, "selected": answer });
        let (status, _, verdict) = call(app.clone(), json_post("/captcha/verify", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verdict["valid"], true);

        let (status, _, verdict) = call(app, json_post("/captcha/verify", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(verdict["valid"], false);
        assert_eq!(verdict["reason"], "already_used");
    }

    #[tokio::test]
    async fn test_verify_unknown_challenge() {
        let app = super::super::tests::app();
        let body = json!({ "challenge_id": "missing", "selected": "x" });
        let (status, _, verdict) = call(app, json_post("/captcha/verify", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(verdict["reason"], "not_found");
    }
}
