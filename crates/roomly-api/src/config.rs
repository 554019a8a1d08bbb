//! Server configuration read from the environment at startup.

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_IDENTITY_HEADER: &str = "x-user-id";

/// Immutable server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Address to bind.
    pub addr: SocketAddr,
    /// Upper bound of the connection pool.
    pub db_max_connections: u32,
    /// Header in which the trusted gateway puts the authenticated user id.
    pub identity_header: HeaderName,
    /// Single origin allowed by CORS; permissive when unset.
    pub cors_allowed_origin: Option<HeaderValue>,
    /// OTLP collector endpoint; span export is disabled when unset.
    pub otel_endpoint: Option<String>,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// is malformed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_owned()))?;

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                AppError::Config(format!("DB_MAX_CONNECTIONS must be a positive integer: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let identity_header = var("IDENTITY_HEADER")
            .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_owned())
            .to_ascii_lowercase()
            .parse::<HeaderName>()
            .map_err(|e| AppError::Config(format!("IDENTITY_HEADER is not a header name: {e}")))?;

        let cors_allowed_origin = var("CORS_ALLOWED_ORIGIN")
            .map(|origin| {
                HeaderValue::from_str(&origin).map_err(|e| {
                    AppError::Config(format!("CORS_ALLOWED_ORIGIN is not a header value: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            database_url,
            addr,
            db_max_connections,
            identity_header,
            cors_allowed_origin,
            otel_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}
