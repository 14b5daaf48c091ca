//! API configuration.

use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Dashboard password; `None` disables authentication
    pub dashboard_password: Option<String>,
    /// HS256 signing secret for login tokens
    pub jwt_secret: String,
    /// Login token lifetime
    pub token_ttl: Duration,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    /// Interval between SSE keep-alive comments
    pub sse_keep_alive: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 64 * 1024,
            dashboard_password: None,
            jwt_secret: random_secret(),
            token_ttl: Duration::from_secs(12 * 60 * 60),
            metrics_enabled: true,
            sse_keep_alive: Duration::from_secs(15),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64 * 1024),
            dashboard_password: std::env::var("DASHBOARD_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
            // Without a configured secret, tokens die with the process
            jwt_secret: std::env::var("DASHBOARD_JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(random_secret),
            token_ttl: Duration::from_secs(
                std::env::var("TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(12 * 60 * 60),
            ),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            sse_keep_alive: Duration::from_secs(
                std::env::var("SSE_KEEP_ALIVE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(15),
            ),
        }
    }

    /// Whether protected routes require a token.
    pub fn auth_enabled(&self) -> bool {
        self.dashboard_password.is_some()
    }
}

fn random_secret() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}
