//! Error types for the services crate.
//!
//! These never reach the dialogue engine: adapters fold them into the tagged
//! failure kinds. They surface only while building the clients.

use thiserror::Error;

/// Result type alias for service setup.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service not configured: {0} is missing")]
    NotConfigured(&'static str),

    #[error("Invalid base URL for {service}: {url}")]
    InvalidUrl { service: &'static str, url: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
