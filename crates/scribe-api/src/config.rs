//! HTTP server configuration.

use axum::http::HeaderValue;
use scribe_jobs::defaults;

/// Server settings read from the environment.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `HOST` | `0.0.0.0` | Bind address |
/// | `PORT` | `3000` | Bind port |
/// | `MAX_UPLOAD_BYTES` | `104857600` | Largest accepted upload |
/// | `CORS_ORIGINS` | `http://localhost:3000` | Comma-separated allowed origins |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            cors_origins: vec![format!("http://localhost:{}", defaults::SERVER_PORT)],
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                config.host = host.trim().to_string();
            }
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Some(max) = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|max| *max > 0)
        {
            config.max_upload_bytes = max;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            let origins = split_origins(&origins);
            if !origins.is_empty() {
                config.cors_origins = origins;
            }
        }
        config
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether `CORS_ORIGINS` contains the `*` wildcard.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    /// Parsed CORS origins; invalid entries are logged and skipped.
    pub fn allowed_origins(&self) -> Vec<HeaderValue> {
        self.cors_origins
            .iter()
            .filter(|origin| origin.as_str() != "*")
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect()
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
