//! Per-connection handling and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track active connections for graceful shutdown
//! - Read one request, dispatch it to the handler, close the connection
//! - Turn read failures and early handler failures into error responses
//!
//! # Design Decisions
//! - One request per connection; the write side is shut down when done
//! - An error response is only attempted while nothing has been written

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::error::WriteError;
use crate::http::handler::Handler;
use crate::http::reader::RequestReader;
use crate::http::response::{default_headers, ResponseWriter, StatusCode, WriterStage};
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks active connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_connection_opened();
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all connections are closed.
    pub async fn wait_for_shutdown(&self) {
        while self.active_count.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Wait for all connections to close, giving up after `timeout`.
    ///
    /// Returns `true` if every connection closed in time.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_for_shutdown())
            .await
            .is_ok()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Transport failure while answering a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("shutdown failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve exactly one request on `stream`, then shut down its write side.
///
/// Read failures are answered with their classified status and the error
/// text as a plain-text body. A handler that fails before writing anything
/// gets the same treatment with its own status and message; a handler that
/// fails mid-response is logged and the connection is closed as is.
pub async fn serve_connection<S, H>(
    mut stream: S,
    handler: &H,
    reader: &RequestReader,
    id: ConnectionId,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    H: Handler,
{
    let request = match reader.read_request(&mut stream).await {
        Ok(request) => request,
        Err(err) => {
            metrics::record_parse_error(err.kind());
            tracing::warn!(
                connection_id = %id,
                kind = err.kind().as_str(),
                error = %err,
                "Failed to read request"
            );
            let status = err.status_code();
            let mut writer = ResponseWriter::new(stream);
            write_error_response(&mut writer, status, &err.to_string()).await?;
            metrics::record_response(status);
            writer.into_inner().shutdown().await?;
            return Ok(());
        }
    };

    metrics::record_request(request.method());
    tracing::debug!(
        connection_id = %id,
        method = %request.method(),
        request_target = request.target(),
        content_length = request.content_length(),
        "Request parsed"
    );

    let mut writer = ResponseWriter::new(stream);
    if let Err(err) = handler.handle(&mut writer, &request).await {
        if writer.stage() == WriterStage::StatusLine {
            tracing::warn!(connection_id = %id, error = %err, "Handler failed");
            write_error_response(&mut writer, err.status, &err.message).await?;
        } else {
            tracing::error!(
                connection_id = %id,
                error = %err,
                stage = %writer.stage(),
                "Handler failed mid-response"
            );
        }
    }

    if let Some(status) = writer.status() {
        metrics::record_response(status);
        tracing::debug!(connection_id = %id, status = status.as_u16(), "Response written");
    }

    writer.into_inner().shutdown().await?;
    Ok(())
}

/// Write a complete plain-text response carrying `message`.
async fn write_error_response<W>(
    writer: &mut ResponseWriter<W>,
    status: StatusCode,
    message: &str,
) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_status_line(status).await?;
    writer
        .write_headers(Some(&default_headers(message.len())), &[], None)
        .await?;
    writer.write_body(message.as_bytes()).await?;
    Ok(())
}
