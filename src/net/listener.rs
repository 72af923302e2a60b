//! Bounded TCP listener.
//!
//! # Responsibilities
//! - Bind the server socket
//! - Hand out one connection slot per accepted stream
//! - Back off after failed accepts
//! - Release the socket on close so late connects are refused
//!
//! # Design Decisions
//! - A slot is taken before `accept`, so at capacity the kernel backlog
//!   absorbs new clients instead of the process
//! - Closing the slot semaphore wakes any accept waiting for capacity

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind: {0}")]
    Bind(std::io::Error),

    #[error("failed to accept: {0}")]
    Accept(std::io::Error),

    /// [`Listener::close`] was called.
    #[error("listener closed")]
    Closed,
}

/// An accepted connection and the slot it occupies.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer_addr: SocketAddr,
    pub slot: ConnectionSlot,
}

/// TCP listener capped at `max_connections` concurrent streams.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let inner = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            slots: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Wait for a free slot, then for the next connection.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, peer_addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer_addr = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        tracing::debug!(
            peer_addr = %peer_addr,
            in_flight = self.in_flight(),
            "Connection accepted"
        );
        Ok(Accepted {
            stream,
            peer_addr,
            slot: ConnectionSlot { _permit: permit },
        })
    }

    /// Stop handing out slots. Pending and later accepts fail with
    /// [`ListenerError::Closed`]; slots already held stay valid.
    ///
    /// The socket itself is released when the listener is dropped.
    pub fn close(&self) {
        self.slots.close();
        tracing::info!(in_flight = self.in_flight(), "Listener closed");
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Connections currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_connections
            .saturating_sub(self.slots.available_permits())
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One of the listener's `max_connections` slots, released on drop.
#[derive(Debug)]
pub struct ConnectionSlot {
    _permit: OwnedSemaphorePermit,
}

/// Delay before retrying after a failed accept.
///
/// Starts at 10ms, doubles per consecutive failure and caps at 1s. Reset on
/// the next successful accept.
#[derive(Debug, Default)]
pub struct AcceptBackoff {
    failures: u32,
}

impl AcceptBackoff {
    const BASE: Duration = Duration::from_millis(10);
    const MAX: Duration = Duration::from_secs(1);

    /// Record a failure and return how long to wait.
    pub fn failed(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let factor = 2u32.saturating_pow(self.failures - 1);
        Self::BASE.saturating_mul(factor).min(Self::MAX)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
