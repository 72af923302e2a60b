//! HTTP/1.1 protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! byte stream (AsyncRead)
//!     → buffer.rs (growable read buffer)
//!     → request.rs (incremental request-line / header / body parser)
//!         → headers.rs (case-insensitive header table)
//!     → reader.rs (drives reads until the request is complete)
//!     → handler.rs (user code, called once per request)
//!     → response.rs (ordered status / headers / body / chunk writer)
//! byte stream (AsyncWrite)
//!
//! server.rs ties the above to the network layer, one task per connection.
//! ```

pub mod buffer;
pub mod error;
pub mod handler;
pub mod headers;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ErrorKind, ParseError, RequestError, WriteError};
pub use handler::{Handler, HandlerError};
pub use headers::Headers;
pub use reader::{read_request, RequestReader};
pub use request::{Method, ParseState, Request, RequestLine, RequestParser};
pub use response::{default_headers, ResponseWriter, StatusCode, WriterStage};
pub use server::HttpServer;
