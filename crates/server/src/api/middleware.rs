//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use trawl_core::{AuthError, AuthRequest, Identity};

use super::error::xml_response;
use super::torznab::{codes, render_error};
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that validates requests using the configured authenticator.
///
/// Credentials may come from the `apikey` query parameter, an
/// `Authorization: Bearer` header or `X-API-Key`. Torznab clients get a
/// Torznab error document instead of a bare 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let authenticator = state.authenticator();

    // Skip auth check if using NoneAuthenticator, but still insert anonymous identity
    if authenticator.method_name() == "none" {
        request.extensions_mut().insert(Identity::anonymous());
        return next.run(request).await;
    }

    let source_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    let mut auth_request = AuthRequest::new(source_ip);
    auth_request.headers = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();
    auth_request.query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|Query(query)| query)
        .unwrap_or_default();

    let reason = match authenticator.authenticate(&auth_request).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            return next.run(request).await;
        }
        Err(AuthError::NotAuthenticated) => "not_authenticated",
        Err(AuthError::InvalidCredentials(_)) => "invalid_credentials",
        Err(_) => "internal_error",
    };
    AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    debug!(reason, ip = %source_ip, path = request.uri().path(), "Request rejected");

    let status = if reason == "internal_error" {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::UNAUTHORIZED
    };
    if request.uri().path().contains("/results/torznab") {
        xml_response(
            status,
            render_error(codes::BAD_CREDENTIALS, "Incorrect user credentials"),
        )
    } else {
        status.into_response()
    }
}

/// Extractor for the authenticated subject.
///
/// Falls back to "anonymous" if no identity is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let subject = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.subject.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        std::future::ready(Ok(AuthUser(subject)))
    }
}
