//! Client-side error type.
//!
//! Transport failures raised inside a queue dispatcher reach callers wrapped
//! as `ClientError::Queue(pickset::Error::Dispatch(..))`, shared by every
//! caller of that batch. [`ClientError::server_status`] looks through that
//! wrapping.

use pickset::DispatchError;

pub type Result<T> = core::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server responded {status}: {message}")]
    Status { status: u16, message: String },

    /// The base URL is not an `http://` or `https://` URL.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// The coalescing queue failed the call.
    #[error(transparent)]
    Queue(#[from] pickset::Error),
}

impl ClientError {
    /// The HTTP status returned by the server, if this failure carries one.
    pub fn server_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Queue(pickset::Error::Dispatch(err)) => err
                .downcast_ref::<ClientError>()
                .and_then(ClientError::server_status),
            _ => None,
        }
    }
}

impl From<ClientError> for DispatchError {
    fn from(err: ClientError) -> Self {
        DispatchError::new(err)
    }
}
