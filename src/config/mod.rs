//! Configuration management for Formgate

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// OAuth / identity provider configuration
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    /// Lifetime of respondent access tokens (fixed 24h by default)
    pub respondent_token_ttl_secs: i64,
}

/// Configuration for the external identity provider handshake
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Redirect URIs a handshake may be started with (exact match)
    pub allowed_redirect_uris: Vec<String>,
    /// Frontend URL the callback redirects to on success (token attached)
    pub frontend_redirect_url: String,
    /// Frontend URL the callback redirects to on domain rejection
    pub frontend_not_allowed_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: env::var("JWT_ISSUER")
                    .unwrap_or_else(|_| "https://formgate.local".to_string()),
                respondent_token_ttl_secs: env::var("JWT_RESPONDENT_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .unwrap_or(86400),
            },
            oauth: OAuthConfig {
                google_client_id: env::var("GOOGLE_OAUTH2_KEY").unwrap_or_default(),
                google_client_secret: env::var("GOOGLE_OAUTH2_SECRET").unwrap_or_default(),
                allowed_redirect_uris: env::var("OAUTH_ALLOWED_REDIRECT_URIS")
                    .map(|s| {
                        s.split(',')
                            .map(|u| u.trim().to_string())
                            .filter(|u| !u.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                frontend_redirect_url: env::var("FRONTEND_REDIRECT_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/live".to_string()),
                frontend_not_allowed_url: env::var("FRONTEND_REDIRECT_URL_NOTALLOWED")
                    .unwrap_or_else(|_| "http://localhost:3000/not-allowed".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
