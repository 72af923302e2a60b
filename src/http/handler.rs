//! User handler seam.

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::http::error::WriteError;
use crate::http::request::Request;
use crate::http::response::{ResponseWriter, StatusCode};

/// Failure reported by a handler.
///
/// When nothing has been written yet, the connection answers with `status`
/// and `message` as a plain-text body.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<WriteError> for HandlerError {
    fn from(e: WriteError) -> Self {
        Self::internal(e.to_string())
    }
}

/// Produces the response for one parsed request.
///
/// Called exactly once per connection, after the request has been read in
/// full. The connection is closed when the returned future completes.
pub trait Handler: Send + Sync + 'static {
    fn handle<'a, W>(
        &'a self,
        writer: &'a mut ResponseWriter<W>,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<(), HandlerError>>
    where
        W: AsyncWrite + Unpin + Send + 'a;
}
