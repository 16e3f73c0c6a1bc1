// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! REST interface for the service.
//!
//! Every API lives in its own `<entity>_<method>.rs` file.  The `tests` module within an API
//! defines a `route` function that returns the HTTP method and path under test, and all tests in
//! that module go through it so that they truly exercise the API they claim to.
//!
//! Failed requests are answered with a `200 OK` status and an `ErrorResponse` body: clients tell
//! errors apart by the presence of the `error_code` field, not by the HTTP status.

use crate::driver::{Driver, DriverError};
use crate::model::ModelError;
use async_trait::async_trait;
use axum::body::{Bytes, HttpBody};
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use log::error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use utoipa::ToSchema;

mod api_docs;
mod health_get;
mod ratelimit;
pub use ratelimit::{RateLimiter, RateLimiterOptions};
mod ride_get;
mod rides_get;
mod rides_post;
#[cfg(test)]
mod testutils;

/// Machine-readable classification of a failed request.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ErrorCode {
    /// The request carried invalid data.
    ValidationError,

    /// The request failed due to an internal problem.
    ServerError,

    /// The request did not match any ride.
    RidesNotFoundError,
}

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub(crate) struct ErrorResponse {
    /// Classification of the error.
    pub(crate) error_code: ErrorCode,

    /// Textual representation of the error message.
    #[schema(example = "Could not find any rides")]
    pub(crate) message: String,
}

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum RestError {
    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::InvalidInput(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let response = match self {
            RestError::InternalError(_) => {
                error!("Request failed due to an internal error: {}", message);
                ErrorResponse {
                    error_code: ErrorCode::ServerError,
                    message: "Unknown error".to_owned(),
                }
            }
            RestError::InvalidRequest(_) | RestError::PayloadNotEmpty => {
                ErrorResponse { error_code: ErrorCode::ValidationError, message }
            }
            RestError::NotFound(_) => {
                ErrorResponse { error_code: ErrorCode::RidesNotFoundError, message }
            }
        };

        (StatusCode::OK, Json(response)).into_response()
    }
}

/// Result type for this module.
pub(crate) type RestResult<T> = Result<T, RestError>;

/// A request body extractor that forbids any content.
///
/// Any API that doesn't expect a body should use this to ensure we don't get garbage data that we
/// don't care about.
pub(crate) struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Returns true if the request declares a JSON payload.
fn has_json_content_type(headers: &HeaderMap) -> bool {
    let mime = match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(content_type) => match content_type.parse::<mime::Mime>() {
            Ok(mime) => mime,
            Err(_) => return false,
        },
        None => return false,
    };

    mime.type_() == "application"
        && (mime.subtype() == "json" || mime.suffix().is_some_and(|name| name == "json"))
}

/// Builds the rejection for a payload that claims to be JSON but cannot be parsed.
fn malformed_json(e: impl std::fmt::Display) -> Response {
    let message = format!("Failed to parse the request body as JSON: {}", e);
    (StatusCode::BAD_REQUEST, message).into_response()
}

/// A request body extractor for JSON objects.
///
/// Payloads without a JSON content type, empty payloads and top-level arrays all deserialize as
/// an empty object, leaving it to the handler to complain about missing fields.  Only payloads
/// that claim to be JSON and are syntactically broken, or that hold a scalar, are rejected, and
/// those get a `400 Bad Request`.
///
/// The payload is first captured as a raw value, which checks the syntax without interpreting
/// numbers, so `T` can hold `RawValue` fields to deal with numbers that do not fit an `f64`.
pub(crate) struct JsonObject<T>(pub(crate) T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonObject<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = has_json_content_type(req.headers());
        let body = Bytes::from_request(req, state).await.map_err(IntoResponse::into_response)?;

        let payload: &[u8] =
            if is_json && !body.iter().all(u8::is_ascii_whitespace) { &body } else { b"{}" };
        let raw: Box<RawValue> = serde_json::from_slice(payload).map_err(malformed_json)?;
        let object = match raw.get().as_bytes().first() {
            Some(b'{') => raw.get(),
            Some(b'[') => "{}",
            _ => return Err(malformed_json("expected an object")),
        };
        serde_json::from_str(object).map(JsonObject).map_err(malformed_json)
    }
}

/// Creates the router for the application.
pub(crate) fn app(driver: Driver, limiter: RateLimiter) -> Router {
    use axum::routing::get;
    Router::new()
        .route("/health", get(health_get::handler))
        .route("/rides", get(rides_get::handler).post(rides_post::handler))
        .route("/rides/:id", get(ride_get::handler))
        .merge(api_docs::swagger_ui())
        .layer(axum::middleware::from_fn_with_state(limiter, ratelimit::rate_limit))
        .with_state(driver)
}
