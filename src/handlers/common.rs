use crate::errors::ServiceError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(|e| {
        warn!(error = %e, "Request validation failed");
        ServiceError::InvalidInput(format!("Validation failed: {}", e))
    })
}

/// Unwraps a JSON body, turning any rejection into `InvalidInput`.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected request body");
        ServiceError::InvalidInput(rejection.body_text())
    })
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    query.map(|Query(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected query string");
        ServiceError::InvalidInput(rejection.body_text())
    })
}

pub fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ServiceError> {
    path.map(|Path(value)| value)
        .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))
}

/// `?userId=` carried by every shopper-facing endpoint.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[validate(range(min = 1))]
    pub user_id: i32,
}

impl UserQuery {
    pub fn from_request(query: Result<Query<Self>, QueryRejection>) -> Result<i32, ServiceError> {
        let query = query_params(query)?;
        validate_input(&query)?;
        Ok(query.user_id)
    }
}

/// `{ "message": ... }` plus one named payload field.
#[derive(Debug, Serialize)]
pub struct MessageResponse<T: Serialize> {
    pub message: &'static str,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> MessageResponse<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        Self { message, data }
    }
}
