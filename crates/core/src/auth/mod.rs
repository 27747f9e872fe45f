//! Client authentication for the HTTP surface.
//!
//! Torznab clients usually can only append `apikey=` to a URL, so the key
//! is accepted as a query parameter as well as in headers.

mod api_key;
mod none;
mod types;

pub use api_key::*;
pub use none::*;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request and return the caller's identity
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}

/// Build the authenticator selected by `[auth]`.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator)),
        AuthMethod::ApiKey => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "api_key must be set when using the api_key method".to_string(),
                    )
                })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}
