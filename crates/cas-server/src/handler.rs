use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use cas_store::{BlobReader, StoreError};
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::body::{request_reader, ExactReader};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Path parameters of the blob routes. Credentials are consumed by the
/// auth gate; handlers only look at the key.
#[derive(Debug, Deserialize)]
pub struct BlobPath {
    pub key: String,
}

/// The router sends `/{access_key}/{secret_key}/` to [`missing_key`], so this
/// only fires if the handlers are mounted on a route that allows an empty key.
fn require_key(key: &str) -> ServerResult<&str> {
    if key.is_empty() {
        tracing::debug!("request without a key");
        return Err(ServerError::MissingKey);
    }
    Ok(key)
}

fn store_failure<'a>(op: &'static str, key: &'a str) -> impl FnOnce(StoreError) -> ServerError + 'a {
    move |err| {
        tracing::warn!(op, key, error = %err, "blob store call failed");
        ServerError::Store(err)
    }
}

/// `GET /{access_key}/{secret_key}/{key}`: stream a blob back.
pub async fn get_blob(
    State(state): State<AppState>,
    Path(path): Path<BlobPath>,
) -> ServerResult<Response> {
    let key = require_key(&path.key)?;

    let exists = state
        .store
        .exists(key)
        .await
        .map_err(store_failure("exists", key))?;
    if !exists {
        return Err(ServerError::BlobNotFound(key.to_string()));
    }

    let BlobReader { reader, length } = state
        .store
        .read(key)
        .await
        .map_err(store_failure("read", key))?;

    // Headers are gone by the time the copy can fail, so the best we can
    // do is cut the connection short of Content-Length and log it.
    let owned_key = key.to_string();
    let stream = ReaderStream::new(ExactReader::new(reader, length)).inspect_err(move |err| {
        tracing::warn!(key = %owned_key, error = %err, "error writing out response");
    });

    Ok((
        StatusCode::OK,
        [(CONTENT_LENGTH, HeaderValue::from(length))],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `PUT /{access_key}/{secret_key}/{key}`: stream the request body into the store.
pub async fn put_blob(
    State(state): State<AppState>,
    Path(path): Path<BlobPath>,
    headers: HeaderMap,
    body: Body,
) -> ServerResult<StatusCode> {
    let key = require_key(&path.key)?;

    if !has_body(&headers) {
        tracing::debug!(key, "put without a body");
        return Err(ServerError::MissingBody);
    }
    let length = declared_length(&headers)?;

    state
        .store
        .write(key, request_reader(body), length)
        .await
        .map_err(store_failure("write", key))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Both verbs on `/{access_key}/{secret_key}/` with nothing after the slash.
pub async fn missing_key() -> ServerError {
    tracing::debug!("request without a key");
    ServerError::MissingKey
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found")
}

/// A request carries a body when it announces one with either framing header.
/// `Content-Length: 0` is an empty body, not a missing one.
fn has_body(headers: &HeaderMap) -> bool {
    headers.contains_key(CONTENT_LENGTH) || headers.contains_key(TRANSFER_ENCODING)
}

/// Parsed `Content-Length`, or `None` when the length is not known up front.
fn declared_length(headers: &HeaderMap) -> ServerResult<Option<u64>> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or(ServerError::InvalidContentLength)
}
