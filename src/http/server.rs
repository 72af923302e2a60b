//! HTTP server accept loop.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Spawn one task per connection running `serve_connection`
//! - Stop accepting on shutdown and drain in-flight connections
//!
//! # Design Decisions
//! - Shutdown is observed through a `ShutdownSignal`, checked before and
//!   during every accept and during accept-error backoff
//! - The listening socket is closed before the drain starts
//! - Drain is bounded by `lifecycle.drain_timeout_secs`; stragglers are left
//!   running rather than aborted

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::http::handler::Handler;
use crate::http::reader::RequestReader;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::{serve_connection, ConnectionTracker};
use crate::net::listener::{AcceptBackoff, Accepted, Listener, ListenerError};

/// HTTP/1.1 server dispatching every request to one handler.
pub struct HttpServer<H> {
    handler: Arc<H>,
    reader: RequestReader,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl<H: Handler> HttpServer<H> {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServerConfig, handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            reader: RequestReader::new(&config.parser),
            tracker: ConnectionTracker::new(),
            drain_timeout: Duration::from_secs(config.lifecycle.drain_timeout_secs),
        }
    }

    /// Run the server until `shutdown` fires, then drain.
    ///
    /// The listening socket is released before draining, so clients that
    /// connect during the drain are refused rather than left unanswered.
    pub async fn run(
        &self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut backoff = AcceptBackoff::default();
        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            let Accepted {
                stream,
                peer_addr,
                slot,
            } = match accepted {
                Ok(accepted) => {
                    backoff.reset();
                    accepted
                }
                Err(ListenerError::Closed) => break,
                Err(e) => {
                    let delay = backoff.failed();
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Accept failed"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            let guard = self.tracker.track();
            let handler = Arc::clone(&self.handler);
            let reader = self.reader.clone();

            tokio::spawn(async move {
                let _slot = slot;
                let id = guard.id();
                tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Serving connection");

                if let Err(e) = serve_connection(stream, handler.as_ref(), &reader, id).await {
                    tracing::debug!(connection_id = %id, error = %e, "Connection ended with error");
                }
                drop(guard);
            });
        }

        let max_connections = listener.max_connections();
        listener.close();
        drop(listener);

        tracing::info!(
            active_connections = self.tracker.active_count(),
            max_connections,
            drain_timeout_secs = self.drain_timeout.as_secs(),
            "Shutdown requested, draining connections"
        );
        if self.tracker.wait_for_drain(self.drain_timeout).await {
            tracing::info!("HTTP server stopped");
        } else {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with connections still open"
            );
        }
        Ok(())
    }
}
