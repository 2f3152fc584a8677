/// Configuration for enrollment-service, loaded from environment variables.
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Max connections in pool
    pub db_max_connections: u32,
    /// Shared signing secret, distributed out-of-band to every service
    pub jwt_secret: String,
    /// Base URL of the course peer, e.g. http://course-service:8082
    pub course_service_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8083),
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            jwt_secret: std::env::var("JWT_SECRET")
                .context("JWT_SECRET environment variable not set")?,
            course_service_url: std::env::var("COURSE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8082".to_string()),
        })
    }
}
