//! HTTP error mapping for the picker API.
//!
//! Every failure is reported as a JSON [`ErrorBody`] with a status chosen by
//! who is at fault:
//!
//! - `400`: malformed query or body, or a request the queue refused up front.
//! - `422`: the store refused the batch the request was part of, e.g. a
//!   selection naming an unknown id.
//! - `500`: any other dispatch failure, or a dispatcher that dropped a result.
//! - `503`: the batch could not be scheduled or was torn down before it
//!   resolved.

use crate::server::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pickset_core::ErrorBody;

pub type Result<T> = core::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    /// The coalescing queue failed the request.
    #[error(transparent)]
    Queue(#[from] pickset::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Queue(pickset::Error::Validation { .. }) => StatusCode::BAD_REQUEST,
            Self::Queue(pickset::Error::Dispatch(err))
                if err.downcast_ref::<StoreError>().is_some() =>
            {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Queue(pickset::Error::NoRuntime | pickset::Error::Abandoned) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
