//! Error types for request parsing and response writing.

use thiserror::Error;

use crate::http::request::ParseState;
use crate::http::response::{StatusCode, WriterStage};

/// Fatal problems found while decoding a request message.
///
/// "Need more data" is not an error: the parser reports it by consuming
/// zero bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request line does not split into exactly three tokens.
    #[error("malformed request line: {0}")]
    RequestLine(&'static str),

    /// Method outside the supported set.
    #[error("unsupported method: {0:?}")]
    Method(String),

    /// Anything other than `HTTP/1.1`.
    #[error("unsupported HTTP version: {0:?}")]
    Version(String),

    /// Request target failed validation.
    #[error("invalid request target: {0:?}")]
    Target(String),

    /// Header line failed token or separator rules.
    #[error("malformed header line: {0}")]
    Header(&'static str),

    /// Content-Length is not a non-negative integer.
    #[error("invalid Content-Length: {0:?}")]
    ContentLength(String),

    /// More body bytes arrived than were declared.
    #[error("body exceeds declared Content-Length of {declared} bytes")]
    ExcessBody { declared: usize },

    /// Declared body is larger than the configured limit.
    #[error("declared body of {declared} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { declared: usize, limit: usize },

    /// Stream ended before the declared body was complete.
    #[error("body ended after {received} of {declared} declared bytes")]
    IncompleteBody { declared: usize, received: usize },
}

/// Broad classification of request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request line or header section.
    Syntax,
    /// Body length disagrees with Content-Length.
    ContentLength,
    /// The transport failed or closed early.
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::ContentLength => "content_length",
            ErrorKind::Transport => "transport",
        }
    }
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::ExcessBody { .. }
            | ParseError::IncompleteBody { .. }
            | ParseError::BodyTooLarge { .. } => ErrorKind::ContentLength,
            _ => ErrorKind::Syntax,
        }
    }
}

/// Errors from reading a full request off a transport.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Reading from the transport failed.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream before the message was complete.
    #[error("connection closed while {state}")]
    UnexpectedEof { state: ParseState },

    /// A single unparsed line outgrew the read buffer limit.
    #[error("request line or header exceeds buffer limit of {limit} bytes")]
    BufferLimit { limit: usize },
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Parse(e) => e.kind(),
            RequestError::BufferLimit { .. } => ErrorKind::Syntax,
            RequestError::Io(_) | RequestError::UnexpectedEof { .. } => ErrorKind::Transport,
        }
    }

    /// Status code for the error response sent back to the client.
    ///
    /// Client-caused failures map to 400, oversized bodies to 413. Only a
    /// failing transport is treated as a server-side problem.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::Parse(ParseError::BodyTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Parse(_)
            | RequestError::UnexpectedEof { .. }
            | RequestError::BufferLimit { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

/// Errors from the response writer.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Operation called out of protocol order. Nothing was written.
    #[error("cannot {operation} while writer is at the {stage} stage")]
    Stage {
        operation: &'static str,
        stage: WriterStage,
    },

    /// Writing to the transport failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let err = RequestError::from(ParseError::Method("BREW".into()));
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = RequestError::from(ParseError::IncompleteBody {
            declared: 20,
            received: 16,
        });
        assert_eq!(err.kind(), ErrorKind::ContentLength);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = RequestError::UnexpectedEof {
            state: ParseState::ParsingHeaders,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn oversized_body_maps_to_payload_too_large() {
        let err = RequestError::from(ParseError::BodyTooLarge {
            declared: 10,
            limit: 1,
        });
        assert_eq!(err.kind(), ErrorKind::ContentLength);
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn transport_failure_maps_to_server_error() {
        let err = RequestError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_name_the_problem() {
        let err = ParseError::ExcessBody { declared: 5 };
        assert_eq!(
            err.to_string(),
            "body exceeds declared Content-Length of 5 bytes"
        );
        let err = WriteError::Stage {
            operation: "write headers",
            stage: WriterStage::StatusLine,
        };
        assert_eq!(
            err.to_string(),
            "cannot write headers while writer is at the status line stage"
        );
    }
}
