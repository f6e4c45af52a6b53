//! Formgate - Survey Access Control Core
//!
//! This crate provides the access-control and respondent-authentication
//! core of the Formgate survey platform: instance registry, respondent
//! store, bulk import, credential issuance and the OAuth handshake.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod import;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod repository;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
