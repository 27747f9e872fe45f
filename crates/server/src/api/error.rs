//! Request errors and their JSON / Torznab renderings.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use trawl_core::AggregateError;

use super::params::ParamError;
use super::torznab::{codes, render_error, XmlError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Xml(#[from] XmlError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Param(_) | Self::Aggregate(AggregateError::Filter(_)) => StatusCode::BAD_REQUEST,
            Self::Aggregate(AggregateError::UnknownSource(_)) => StatusCode::NOT_FOUND,
            Self::Xml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn torznab_code(&self) -> u16 {
        match self {
            Self::Param(ParamError::Missing(_)) => codes::MISSING_PARAMETER,
            Self::Param(ParamError::Incorrect { .. }) | Self::Aggregate(_) => {
                codes::INCORRECT_PARAMETER
            }
            Self::Param(ParamError::NoSuchFunction(_)) => codes::NO_SUCH_FUNCTION,
            Self::Xml(_) => codes::UNKNOWN_ERROR,
        }
    }

    /// JSON body, for the non-Torznab endpoints.
    pub fn into_json(self) -> (StatusCode, Json<ErrorResponse>) {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
    }

    /// Torznab `<error>` document.
    pub fn into_torznab(self) -> Response {
        let status = match self {
            Self::Xml(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        xml_response(status, render_error(self.torznab_code(), &self.to_string()))
    }
}

pub fn xml_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        body,
    )
        .into_response()
}
