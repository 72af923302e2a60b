//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → accept loop stops → listener closed → drain connections (bounded) → exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, release the socket, then drain
//! - The flag lives in a `watch` channel, so late subscribers still see it
//! - Shutdown has timeout: in-flight connections get `drain_timeout_secs`

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::shutdown_signal;
