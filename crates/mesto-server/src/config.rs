use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use axum::http::HeaderValue;
use tracing::info;

/// Placeholder token secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub secure_cookies: bool,
    /// Origins allowed to send credentialed cross-origin requests.
    pub cors_origins: Vec<HeaderValue>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| {
            var(key).unwrap_or_else(|| {
                info!("{} not set, using default: {}", key, default);
                default.to_string()
            })
        };

        let jwt_secret = var("MESTO_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MESTO_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = get("MESTO_HOST", "0.0.0.0");
        let port: u16 = get("MESTO_PORT", "3000")
            .parse()
            .context("MESTO_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let token_ttl_days: i64 = get("MESTO_TOKEN_TTL_DAYS", "7")
            .parse()
            .context("MESTO_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days <= 0 {
            bail!("MESTO_TOKEN_TTL_DAYS must be positive");
        }

        let secure_cookies = match get("MESTO_COOKIE_SECURE", "false").as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => bail!("MESTO_COOKIE_SECURE must be true or false, got '{}'", other),
        };

        let cors_origins = get("MESTO_CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                if origin == "*" {
                    bail!("MESTO_CORS_ORIGINS cannot contain '*' because sessions are sent with credentials");
                }
                HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin '{}'", origin))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            addr,
            db_path: get("MESTO_DB_PATH", "mesto.db").into(),
            jwt_secret,
            token_ttl_days,
            secure_cookies,
            cors_origins,
        })
    }
}
