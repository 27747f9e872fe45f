use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;

/// The parts of an HTTP request an authenticator may inspect.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    /// Decoded query string parameters.
    pub query: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    pub fn new(source_ip: IpAddr) -> Self {
        Self {
            headers: HashMap::new(),
            query: HashMap::new(),
            source_ip,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }
}

/// Who made a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}
