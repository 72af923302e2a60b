//! Driving loop that assembles a request from a byte stream.
//!
//! # Data Flow
//! ```text
//! transport.read() → ReadBuffer (grows by doubling)
//!     → RequestParser::parse(filled)
//!     → ReadBuffer::take_parsed(consumed)
//!     → repeat until Done
//! ```
//!
//! # Design Decisions
//! - End of stream before `Done` is an error, never a truncated request
//! - Only the unparsed tail stays buffered, so the limit bounds one line

use tokio::io::AsyncRead;

use crate::config::ParserConfig;
use crate::http::buffer::ReadBuffer;
use crate::http::error::{ParseError, RequestError};
use crate::http::request::{ParseState, Request, RequestParser};

/// Reads one request per call from an async byte stream.
#[derive(Debug, Clone)]
pub struct RequestReader {
    initial_buffer_size: usize,
    max_buffer_size: usize,
    max_body_size: usize,
}

impl RequestReader {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            initial_buffer_size: config.initial_buffer_size,
            max_buffer_size: config.max_buffer_size,
            max_body_size: config.max_body_size,
        }
    }

    /// Read from `reader` until a complete request has been parsed.
    pub async fn read_request<R>(&self, reader: &mut R) -> Result<Request, RequestError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buffer = ReadBuffer::with_limit(self.initial_buffer_size, self.max_buffer_size);
        let mut parser = RequestParser::with_max_body_size(self.max_body_size);

        while !parser.is_done() {
            let n = buffer.fill_from(reader).await?;
            if n == 0 {
                return Err(end_of_stream(&parser));
            }

            let consumed = parser.parse(buffer.filled())?;
            buffer.take_parsed(consumed);

            tracing::trace!(
                read = n,
                consumed,
                buffered = buffer.len(),
                state = ?parser.state(),
                "Parser advanced"
            );
        }

        parser
            .into_request()
            .ok_or(RequestError::UnexpectedEof { state: ParseState::Done })
    }
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

/// Read a single request using the default limits.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, RequestError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    RequestReader::default().read_request(reader).await
}

fn end_of_stream(parser: &RequestParser) -> RequestError {
    match parser.state() {
        ParseState::ParsingBody => ParseError::IncompleteBody {
            declared: parser.content_length(),
            received: parser.body_len(),
        }
        .into(),
        state => RequestError::UnexpectedEof { state },
    }
}
