//! Incremental HTTP/1.1 server core over raw TCP.
//!
//! Requests are parsed incrementally from any `AsyncRead`, however the bytes
//! happen to be fragmented, and responses are written through a writer that
//! enforces status line, headers, body ordering and supports chunked bodies
//! with trailers.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Application
pub mod handlers;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::{Handler, HttpServer};
pub use lifecycle::Shutdown;
