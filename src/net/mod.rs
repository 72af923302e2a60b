//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (connection slots, accept backoff, close)
//!     → connection.rs (tracking, read request, dispatch handler, close)
//!     → Hand off to user Handler
//!
//! Connection lifetime:
//!     Accepted → Reading → Handling → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept via semaphore prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - One request per connection; the write side is shut down afterwards

pub mod connection;
pub mod listener;

pub use connection::{serve_connection, ConnectionError, ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{AcceptBackoff, Accepted, ConnectionSlot, Listener, ListenerError};
