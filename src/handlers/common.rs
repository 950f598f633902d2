use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{config::AppConfig, errors::ServiceError, ApiResponse};

/// Path the gateway sends the buyer back to.
pub const CALLBACK_PATH: &str = "/paystack/callback";

const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Absolute callback URL for the gateway.
///
/// Uses the configured public base URL when set, otherwise the request host
/// (as resolved by [`axum::extract::Host`]) and `X-Forwarded-Proto`,
/// defaulting to `http`.
pub fn callback_url(
    config: &AppConfig,
    host: Option<&str>,
    headers: &HeaderMap,
) -> Result<String, ServiceError> {
    if let Some(base) = config.public_base_url.as_deref() {
        return Ok(format!("{}{}", base.trim_end_matches('/'), CALLBACK_PATH));
    }

    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            ServiceError::BadRequest("Cannot build callback URL without a request host".into())
        })?;

    let scheme = headers
        .get(FORWARDED_PROTO_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|p| matches!(*p, "http" | "https"))
        .unwrap_or("http");

    Ok(format!("{}://{}{}", scheme, host, CALLBACK_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    #[test]
    fn configured_base_url_wins() {
        let mut cfg = config();
        cfg.public_base_url = Some("https://shop.example.com/".into());
        assert_eq!(
            callback_url(&cfg, Some("internal:8080"), &HeaderMap::new()).unwrap(),
            "https://shop.example.com/paystack/callback"
        );
    }

    #[test]
    fn request_host_and_forwarded_proto_are_used() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            callback_url(&config(), Some("shop.test"), &headers).unwrap(),
            "http://shop.test/paystack/callback"
        );

        headers.insert(FORWARDED_PROTO_HEADER, HeaderValue::from_static("https"));
        assert_eq!(
            callback_url(&config(), Some("shop.test"), &headers).unwrap(),
            "https://shop.test/paystack/callback"
        );
    }

    #[test]
    fn missing_host_is_a_bad_request() {
        for host in [None, Some("  ")] {
            let err = callback_url(&config(), host, &HeaderMap::new()).unwrap_err();
            assert!(matches!(err, ServiceError::BadRequest(_)));
        }
    }
}
