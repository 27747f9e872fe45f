//! API key authentication.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Validates requests against a single configured key.
///
/// The key may arrive as:
/// - `apikey=<key>` query parameter (what Torznab clients send)
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
pub struct ApiKeyAuthenticator {
    expected_digest: [u8; 32],
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_digest: digest(&api_key),
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(key) = request.query.get("apikey") {
            return Some(key);
        }

        if let Some(header) = request.headers.get("authorization") {
            if let Some(key) = header
                .strip_prefix("Bearer ")
                .or_else(|| header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        request.headers.get("x-api-key").map(String::as_str)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(&digest(provided), &self.expected_digest) {
            Ok(Identity {
                subject: "api_key_client".to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
