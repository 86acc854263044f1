use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::logic::{Outcome, ResponseClass, ServiceError};

/// Body returned for every non-success response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            detail: None,
        }
    }
}

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// An error ready to go on the wire.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    /// The only body a client ever sees for a fault.
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse::new(INTERNAL_ERROR_MESSAGE),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(rejection) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorResponse {
                    error: rejection.message().to_string(),
                    detail: rejection.detail,
                },
            },
            ServiceError::NotFound => Self {
                status: StatusCode::NOT_FOUND,
                body: ErrorResponse::new("No matching records found"),
            },
            // Storage details stay in the log
            ServiceError::Storage(_) => Self::internal(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn status_of(class: ResponseClass) -> StatusCode {
    StatusCode::from_u16(class.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        let status = status_of(self.class());
        match self {
            Outcome::Ok(body) | Outcome::Created(body) => (status, Json(body)).into_response(),
            Outcome::NoContent | Outcome::Done => status.into_response(),
        }
    }
}
