//! Request model and resumable request parser.
//!
//! # Responsibilities
//! - Validate the request line (method, target, version)
//! - Drive the header decoder and read Content-Length
//! - Collect exactly Content-Length body bytes
//!
//! # Design Decisions
//! - `parse` consumes only complete syntactic units and reports how many
//!   bytes it took; zero with no error means "need more data"
//! - States only move forward; `Done` is terminal and idempotent
//! - A `Request` is only handed out once the parser reaches `Done`

use std::fmt;
use std::str::FromStr;

use crate::http::error::ParseError;
use crate::http::headers::{find_crlf, Headers, CRLF};

/// The only protocol version accepted on the request line.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Characters never allowed in a request target.
const DISALLOWED_TARGET_CHARS: &[u8] = b"\\ +\n<>|\"'{}^";

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(ParseError::Method(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    /// Origin-form target, always starting with `/`.
    pub target: String,
    /// Version number without the `HTTP/` prefix, e.g. `1.1`.
    pub version: String,
}

impl RequestLine {
    /// Parse the request line at the start of `data`.
    ///
    /// Returns `Ok(None)` while the line is not yet terminated by CRLF.
    pub fn parse(data: &[u8]) -> Result<Option<(Self, usize)>, ParseError> {
        let Some(idx) = find_crlf(data) else {
            return Ok(None);
        };
        let line = std::str::from_utf8(&data[..idx])
            .map_err(|_| ParseError::RequestLine("request line is not valid UTF-8"))?;

        let parts: Vec<&str> = line.split(' ').collect();
        let [method, target, version] = parts[..] else {
            return Err(ParseError::RequestLine("expected method, target and version"));
        };

        let method = method.parse::<Method>()?;

        if version != HTTP_VERSION {
            return Err(ParseError::Version(version.to_string()));
        }

        if !is_valid_target(target) {
            return Err(ParseError::Target(target.to_string()));
        }

        let request_line = RequestLine {
            method,
            target: target.to_string(),
            version: version["HTTP/".len()..].to_string(),
        };
        Ok(Some((request_line, idx + CRLF.len())))
    }
}

fn is_valid_target(target: &str) -> bool {
    target.starts_with('/')
        && target.is_ascii()
        && !target.bytes().any(|b| DISALLOWED_TARGET_CHARS.contains(&b))
}

/// Parser progress through a request message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    #[default]
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseState::Initialized => "awaiting request line",
            ParseState::ParsingHeaders => "parsing headers",
            ParseState::ParsingBody => "parsing body",
            ParseState::Done => "done",
        };
        f.write_str(s)
    }
}

/// A fully parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> Method {
        self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    pub fn version(&self) -> &str {
        &self.request_line.version
    }

    /// Declared body length; zero when Content-Length is absent.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Resumable state machine that builds a [`Request`] from a byte buffer.
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    request_line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    content_length: usize,
    max_body_size: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::with_max_body_size(usize::MAX)
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that rejects any declared body above `limit` bytes.
    pub fn with_max_body_size(limit: usize) -> Self {
        Self {
            state: ParseState::Initialized,
            request_line: None,
            headers: Headers::new(),
            body: Vec::new(),
            content_length: 0,
            max_body_size: limit,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Declared Content-Length, known once the header section is parsed.
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Body bytes collected so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Consume as many complete units of `data` as possible.
    ///
    /// Returns the number of bytes consumed. The caller must drop those bytes
    /// from the front of its buffer before calling again with more input.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut read = 0;

        loop {
            match self.state {
                ParseState::Done => return Ok(read),

                ParseState::Initialized => {
                    let Some((line, n)) = RequestLine::parse(&data[read..])? else {
                        return Ok(read);
                    };
                    self.request_line = Some(line);
                    read += n;
                    self.advance(ParseState::ParsingHeaders);
                }

                ParseState::ParsingHeaders => {
                    let (n, done) = self.headers.parse(&data[read..])?;
                    read += n;
                    if !done {
                        return Ok(read);
                    }

                    self.content_length = declared_content_length(&self.headers)?;
                    if self.content_length > self.max_body_size {
                        return Err(ParseError::BodyTooLarge {
                            declared: self.content_length,
                            limit: self.max_body_size,
                        });
                    }
                    if self.content_length > 0 {
                        self.advance(ParseState::ParsingBody);
                    } else {
                        self.advance(ParseState::Done);
                    }
                }

                ParseState::ParsingBody => {
                    let available = &data[read..];
                    if self.body.len() + available.len() > self.content_length {
                        return Err(ParseError::ExcessBody {
                            declared: self.content_length,
                        });
                    }
                    if available.is_empty() {
                        return Ok(read);
                    }

                    self.body.extend_from_slice(available);
                    read += available.len();

                    if self.body.len() == self.content_length {
                        self.advance(ParseState::Done);
                    }
                }
            }
        }
    }

    /// Take the finished request. Returns `None` until the parser is done.
    pub fn into_request(self) -> Option<Request> {
        if !self.is_done() {
            return None;
        }
        Some(Request {
            request_line: self.request_line?,
            headers: self.headers,
            body: self.body,
        })
    }

    fn advance(&mut self, next: ParseState) {
        debug_assert!(next > self.state, "parse state moved backwards");
        self.state = next;
    }
}

fn declared_content_length(headers: &Headers) -> Result<usize, ParseError> {
    match headers.get("content-length") {
        None => Ok(0),
        Some(raw) => {
            let raw = raw.trim();
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseError::ContentLength(raw.to_string()));
            }
            raw.parse::<usize>()
                .map_err(|_| ParseError::ContentLength(raw.to_string()))
        }
    }
}
