// HTTP mapping for gateway errors
//
// 400 invalid input, 401 unauthenticated, 403 quota or ownership, 404 not
// found, 429 rate limited, 503 dependency failure. Bodies for 403 ownership
// and 503 carry only a generic message.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::GatewayError;
use crate::rate_limit::RateDecision;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// `X-RateLimit-*` headers for a decision
pub fn rate_limit_headers(decision: &RateDecision) -> HeaderMap {
    window_headers(decision.limit, decision.remaining, decision.reset_in_secs)
}

fn window_headers(limit: u32, remaining: u32, reset_in_secs: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(reset_in_secs));
    headers
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::QuotaExceeded { .. } | GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            GatewayError::InvalidInput(message) => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            GatewayError::Unauthenticated(_) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                (status, headers, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            GatewayError::RateLimited {
                limit,
                remaining,
                retry_after_secs,
            } => {
                let mut headers = window_headers(limit, remaining, retry_after_secs);
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                let body = json!({
                    "error": "Rate limit exceeded",
                    "retryAfter": retry_after_secs,
                });
                (status, headers, Json(body)).into_response()
            }
            GatewayError::QuotaExceeded {
                tokens_used,
                tokens_limit,
                requested,
            } => {
                let body = json!({
                    "error": "Token quota exceeded",
                    "tokensUsed": tokens_used,
                    "tokensLimit": tokens_limit,
                    "tokensRequested": requested,
                });
                (status, Json(body)).into_response()
            }
            GatewayError::NotFound => (status, Json(json!({ "error": "Not found" }))).into_response(),
            GatewayError::Forbidden => {
                (status, Json(json!({ "error": "Access denied" }))).into_response()
            }
            GatewayError::DependencyUnavailable { .. } => {
                let mut headers = HeaderMap::new();
                headers.insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
                let body = json!({ "error": "Service temporarily unavailable" });
                (status, headers, Json(body)).into_response()
            }
        }
    }
}
