//! Response writer with enforced protocol ordering.
//!
//! # Responsibilities
//! - Write the status line, header section and body in order
//! - Frame chunked bodies and trailers byte-for-byte
//! - Reject out-of-order calls before touching the transport
//!
//! # Design Decisions
//! - Every operation asks `WriterStage::transition` first; a rejected call
//!   writes nothing
//! - Chunk and trailer sequencing inside the body stage is left to the caller
//! - Each operation is flushed fully or fails with the transport error

use std::fmt;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::WriteError;
use crate::http::headers::Headers;

const CRLF: &str = "\r\n";

/// Numeric HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Canonical reason phrase; empty for codes without a fixed one.
    pub fn reason(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            500 => "Internal Server Error",
            _ => "",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}

/// Protocol stage of a response in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WriterStage {
    StatusLine,
    Headers,
    Body,
}

impl fmt::Display for WriterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriterStage::StatusLine => "status line",
            WriterStage::Headers => "headers",
            WriterStage::Body => "body",
        };
        f.write_str(s)
    }
}

/// Writer operations, used to check ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StatusLine,
    Headers,
    Body,
    Chunk,
    ChunkedBodyDone,
    Trailers,
}

impl Operation {
    fn describe(&self) -> &'static str {
        match self {
            Operation::StatusLine => "write status line",
            Operation::Headers => "write headers",
            Operation::Body => "write body",
            Operation::Chunk => "write chunk",
            Operation::ChunkedBodyDone => "finish chunked body",
            Operation::Trailers => "write trailers",
        }
    }
}

impl WriterStage {
    /// Stage reached after performing `op`, or an error if `op` is not
    /// allowed in this stage.
    pub fn transition(self, op: Operation) -> Result<WriterStage, WriteError> {
        match (self, op) {
            (WriterStage::StatusLine, Operation::StatusLine) => Ok(WriterStage::Headers),
            (WriterStage::Headers, Operation::Headers) => Ok(WriterStage::Body),
            (
                WriterStage::Body,
                Operation::Body | Operation::Chunk | Operation::ChunkedBodyDone | Operation::Trailers,
            ) => Ok(WriterStage::Body),
            (stage, op) => Err(WriteError::Stage {
                operation: op.describe(),
                stage,
            }),
        }
    }
}

/// Default headers for a response with a body of `content_length` bytes.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// Writes one response to a transport sink.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    sink: W,
    stage: WriterStage,
    status: Option<StatusCode>,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            stage: WriterStage::StatusLine,
            status: None,
        }
    }

    pub fn stage(&self) -> WriterStage {
        self.stage
    }

    /// Status code written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Write `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        let next = self.stage.transition(Operation::StatusLine)?;
        let line = format!("HTTP/1.1 {} {}{CRLF}", status.as_u16(), status.reason());
        self.send(line.as_bytes()).await?;
        self.stage = next;
        self.status = Some(status);
        Ok(())
    }

    /// Write the header section.
    ///
    /// Starts from [`default_headers`] with a zero length, lets `headers`
    /// override them, removes every name in `remove`, then announces each
    /// trailer name with its own `Trailer` line. When `trailers` is given, a
    /// `Trailer` entry in `headers` is dropped so names are announced once.
    pub async fn write_headers(
        &mut self,
        headers: Option<&Headers>,
        remove: &[&str],
        trailers: Option<&Headers>,
    ) -> Result<(), WriteError> {
        let next = self.stage.transition(Operation::Headers)?;

        let mut merged = default_headers(0);
        if let Some(headers) = headers {
            for (name, value) in headers.iter() {
                merged.replace(name, value);
            }
        }
        for name in remove {
            merged.delete(name);
        }
        if trailers.is_some() {
            merged.delete("Trailer");
        }

        let mut section = String::new();
        for (name, value) in merged.iter() {
            section.push_str(&format!("{name}: {value}{CRLF}"));
        }
        if let Some(trailers) = trailers {
            for name in trailers.names() {
                section.push_str(&format!("Trailer: {name}{CRLF}"));
            }
        }
        section.push_str(CRLF);

        self.send(section.as_bytes()).await?;
        self.stage = next;
        Ok(())
    }

    /// Write body bytes verbatim. Returns the number of bytes written.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        self.stage.transition(Operation::Body)?;
        self.send(body).await?;
        Ok(body.len())
    }

    /// Write one chunk: `<hex-length>\r\n<bytes>\r\n`.
    ///
    /// An empty chunk is framed like any other and does not end the body.
    /// Returns the payload length.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, WriteError> {
        self.stage.transition(Operation::Chunk)?;
        let mut frame = Vec::with_capacity(chunk.len() + 20);
        frame.extend_from_slice(format!("{:x}{CRLF}", chunk.len()).as_bytes());
        frame.extend_from_slice(chunk);
        frame.extend_from_slice(CRLF.as_bytes());
        self.send(&frame).await?;
        Ok(chunk.len())
    }

    /// Write the terminating `0\r\n` chunk.
    ///
    /// The closing blank line comes from [`write_trailers`](Self::write_trailers).
    pub async fn write_chunked_body_done(&mut self) -> Result<usize, WriteError> {
        self.stage.transition(Operation::ChunkedBodyDone)?;
        let frame = format!("0{CRLF}");
        self.send(frame.as_bytes()).await?;
        Ok(frame.len())
    }

    /// Write each trailer as `name:value\r\n`, then the final blank line.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        self.stage.transition(Operation::Trailers)?;
        let mut section = String::new();
        for (name, value) in trailers.iter() {
            section.push_str(&format!("{name}:{value}{CRLF}"));
        }
        section.push_str(CRLF);
        self.send(section.as_bytes()).await
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.sink.write_all(bytes).await?;
        self.sink.flush().await?;
        Ok(())
    }
}
