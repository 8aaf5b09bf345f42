//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tutora_shared::constants::DEFAULT_HTTP_PORT;

/// Development-only signing secret, replaced by `JWT_SECRET` in production.
const DEV_JWT_SECRET: &str = "tutora-dev-secret-change-me";

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./tutora.db`
    pub database_path: PathBuf,

    /// HS256 signing secret for bearer tokens.
    /// Env: `JWT_SECRET`
    pub jwt_secret: String,

    /// Bearer token lifetime.
    /// Env: `JWT_TTL_HOURS`
    /// Default: `168` (7 days)
    pub jwt_ttl: Duration,

    /// Base URL for generated meeting links (`<base>/class-<uuid>`).
    /// Env: `MEETING_BASE_URL`
    /// Default: `https://meet.jit.si`
    pub meeting_base_url: String,

    /// Front-end origin allowed by CORS. `None` allows any origin.
    /// Env: `CLIENT_URL`
    pub client_url: Option<String>,

    /// Requests per client IP per window (auth routes are exempt).
    /// Env: `RATE_LIMIT_MAX`
    /// Default: `1000`
    pub rate_limit_max: u32,

    /// Env: `RATE_LIMIT_WINDOW_SECS`
    /// Default: `900` (15 minutes)
    pub rate_limit_window: Duration,

    // -- Admin bootstrap --

    /// Env: `ADMIN_EMAIL`
    pub admin_email: Option<String>,

    /// Env: `ADMIN_PASSWORD`
    pub admin_password: Option<String>,

    /// Sender address for outgoing notifications.
    /// Env: `MAIL_FROM`
    /// Default: `Tutora <no-reply@tutora.local>`
    pub mail_from: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("jwt_ttl", &self.jwt_ttl)
            .field("meeting_base_url", &self.meeting_base_url)
            .field("client_url", &self.client_url)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("admin_email", &self.admin_email)
            .field("mail_from", &self.mail_from)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./tutora.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: Duration::from_secs(168 * 3600),
            meeting_base_url: "https://meet.jit.si".to_string(),
            client_url: None,
            rate_limit_max: 1000,
            rate_limit_window: Duration::from_secs(15 * 60),
            admin_email: None,
            admin_password: None,
            mail_from: "Tutora <no-reply@tutora.local>".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        match var("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => tracing::warn!("JWT_SECRET not set, using the development secret"),
        }

        if let Some(val) = var("JWT_TTL_HOURS") {
            match val.parse::<u64>() {
                Ok(hours) if hours > 0 => config.jwt_ttl = Duration::from_secs(hours * 3600),
                _ => tracing::warn!(value = %val, "Invalid JWT_TTL_HOURS, using default"),
            }
        }

        if let Some(url) = var("MEETING_BASE_URL") {
            config.meeting_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = var("CLIENT_URL") {
            if !url.is_empty() {
                config.client_url = Some(url);
            }
        }

        if let Some(val) = var("RATE_LIMIT_MAX") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.rate_limit_max = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_MAX, using default"),
            }
        }

        if let Some(val) = var("RATE_LIMIT_WINDOW_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.rate_limit_window = Duration::from_secs(n),
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_WINDOW_SECS, using default"),
            }
        }

        config.admin_email = var("ADMIN_EMAIL").filter(|v| !v.is_empty());
        config.admin_password = var("ADMIN_PASSWORD").filter(|v| !v.is_empty());

        if let Some(from) = var("MAIL_FROM") {
            config.mail_from = from;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// `<base>/class-<id>`
    pub fn meeting_link(&self, id: uuid::Uuid) -> String {
        format!("{}/class-{}", self.meeting_base_url, id)
    }
}
