//! Server configuration from environment variables.

use axum::http::HeaderValue;

use snapsort_core::defaults;

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit in bytes.
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<HeaderValue>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            allowed_origins: parse_origins(defaults::ALLOWED_ORIGINS),
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `MAX_UPLOAD_BYTES`, `ALLOWED_ORIGINS`.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| defaults::SERVER_HOST.to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults::SERVER_PORT),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::MAX_UPLOAD_BYTES),
            allowed_origins: parse_allowed_origins(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// CORS origin whitelist from `ALLOWED_ORIGINS` (comma-separated).
///
/// Falls back to the local development origins when unset or empty.
pub fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS").unwrap_or_default();
    if origins_str.trim().is_empty() {
        return parse_origins(defaults::ALLOWED_ORIGINS);
    }
    parse_origins(&origins_str)
}

fn parse_origins(origins_str: &str) -> Vec<HeaderValue> {
    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}
