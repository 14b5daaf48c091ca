//! Dashboard password login and bearer token verification.

use std::time::Duration;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Subject placed in every dashboard token.
const DASHBOARD_SUBJECT: &str = "dashboard";

/// Claims of a dashboard login token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 keys for issuing and checking login tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Sign a fresh token.
    pub fn issue(&self) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = DashboardClaims {
            sub: DASHBOARD_SUBJECT.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> ApiResult<DashboardClaims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<DashboardClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token verification failed");
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Constant-time password comparison.
pub fn password_matches(expected: &str, given: &str) -> bool {
    expected.len() == given.len() && bool::from(expected.as_bytes().ct_eq(given.as_bytes()))
}

/// Caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer header first, then the `token` query parameter (EventSource
/// cannot set headers).
fn request_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|q| q.0.token)
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.config.auth_enabled() {
            return Ok(AuthUser {
                subject: "anonymous".to_string(),
            });
        }

        let token = request_token(parts).ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
        let claims = state.tokens.verify(&token)?;

        Ok(AuthUser { subject: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_verify() {
        let keys = TokenKeys::new("secret", Duration::from_secs(60));
        let token = keys.issue().unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, DASHBOARD_SUBJECT);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = TokenKeys::new("one", Duration::from_secs(60)).issue().unwrap();
        let err = TokenKeys::new("two", Duration::from_secs(60))
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_password_matches() {
        assert!(password_matches("hunter2", "hunter2"));
        assert!(!password_matches("hunter2", "hunter3"));
        assert!(!password_matches("hunter2", "hunter"));
        assert!(!password_matches("hunter2", "hunter22"));
        assert!(!password_matches("hunter2", ""));
        assert!(password_matches("", ""));
    }

    #[test]
    fn test_request_token_sources() {
        let (parts, _) = axum::http::Request::builder()
            .uri("/api/tasks/Build/stream?token=abc")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_token(&parts).as_deref(), Some("abc"));

        let (parts, _) = axum::http::Request::builder()
            .uri("/api/monitor?token=abc")
            .header("Authorization", "Bearer xyz")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_token(&parts).as_deref(), Some("xyz"));
    }
}
