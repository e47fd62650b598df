use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced by the HTTP layer.
///
/// The `Display` text doubles as the plain-text response body.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("No key provided")]
    MissingKey,

    #[error("No body provided")]
    MissingBody,

    #[error("Invalid Content-Length header")]
    InvalidContentLength,

    #[error("Unauthorized.")]
    Unauthorized,

    #[error("Key {0} does not exist")]
    BlobNotFound(String),

    #[error("Error talking to blobstore: {0}")]
    Store(#[from] cas_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingKey | Self::MissingBody | Self::InvalidContentLength => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BlobNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
