//! Case-insensitive header table and header-section decoder.
//!
//! # Responsibilities
//! - Store header fields under lower-cased names
//! - Decode `name: value\r\n` lines incrementally from a byte buffer
//! - Join repeated header lines with a comma
//!
//! # Design Decisions
//! - Storage is private; every mutator folds the name first
//! - Names are kept sorted so serialization is deterministic
//! - A syntax error consumes nothing; the caller drops the message

use std::collections::BTreeMap;

use crate::http::error::ParseError;

/// Line terminator for every HTTP/1.1 line.
pub const CRLF: &[u8] = b"\r\n";

/// Punctuation allowed in a header field name besides letters and digits.
const TOKEN_PUNCTUATION: &[u8] = b"!#$%&'*+-.^_`|~";

/// A set of header fields keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&fold(name)).map(String::as_str)
    }

    /// Set a value, overwriting any previous value for the same name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(fold(name), value.into());
    }

    /// Overwrite a value and return the one it replaced.
    pub fn replace(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.fields.insert(fold(name), value.into())
    }

    /// Remove a header and return its value.
    pub fn delete(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&fold(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&fold(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over the stored names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Decode as many complete header lines as `data` holds.
    ///
    /// Returns the number of bytes consumed and whether the blank line that
    /// ends the header section was reached. An unterminated trailing line is
    /// left for the next call.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let mut read = 0;

        loop {
            let Some(idx) = find_crlf(&data[read..]) else {
                return Ok((read, false));
            };
            let line = trim_end(&data[read..read + idx]);
            read += idx + CRLF.len();

            if line.iter().all(|b| *b == b' ' || *b == b'\t') {
                return Ok((read, true));
            }

            let (name, value) = parse_header_line(line)?;
            self.append(name, &value);
        }
    }

    /// Add a decoded value, comma-joining it onto an existing one.
    fn append(&mut self, name: &str, value: &str) {
        self.fields
            .entry(fold(name))
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
}

/// Split one header line at its first colon and validate the name.
fn parse_header_line(line: &[u8]) -> Result<(&str, String), ParseError> {
    let colon = line
        .iter()
        .position(|b| *b == b':')
        .ok_or(ParseError::Header("missing ':' separator"))?;

    let name = &line[..colon];
    if name.is_empty() {
        return Err(ParseError::Header("empty field name"));
    }
    if !name.iter().all(|b| is_token_char(*b)) {
        return Err(ParseError::Header("invalid character in field name"));
    }

    let raw_value = &line[colon + 1..];
    let raw_value = raw_value.strip_prefix(b" ").unwrap_or(raw_value);

    // Token characters are ASCII, so the name is valid UTF-8.
    let name = std::str::from_utf8(name).map_err(|_| ParseError::Header("non-ASCII field name"))?;
    Ok((name, String::from_utf8_lossy(raw_value).into_owned()))
}

/// Letters, digits and the fixed punctuation set.
pub fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || TOKEN_PUNCTUATION.contains(&b)
}

/// Position of the first `\r\n` in `data`.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| *b != b' ' && *b != b'\t')
        .map_or(0, |i| i + 1);
    &line[..end]
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_header_and_terminator() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(headers.get("Host"), Some("localhost:42069"));
        assert_eq!(n, 25);
        assert!(done);
    }

    #[test]
    fn unterminated_section_needs_more_data() {
        let mut headers = Headers::new();
        let (n, done) = headers.parse(b"Host: localhost:42069\r\n").unwrap();
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(n, 23);
        assert!(!done);

        let mut headers = Headers::new();
        let (n, done) = headers.parse(b"Host: local").unwrap();
        assert_eq!(n, 0);
        assert!(!done);
        assert!(headers.is_empty());
    }

    #[test]
    fn repeated_names_are_comma_joined() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\napi_key: *******\r\napi_key: 1234\r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(headers.get("Host"), Some("localhost:42069"));
        assert_eq!(headers.get("api_key"), Some("*******,1234"));
        assert_eq!(n, data.len());
        assert!(done);

        let mut headers = Headers::new();
        headers.parse(b"a: 1\r\na: 2\r\n\r\n").unwrap();
        assert_eq!(headers.get("a"), Some("1,2"));
    }

    #[test]
    fn joins_across_separate_parse_calls() {
        let mut headers = Headers::new();
        let (n, _) = headers.parse(b"Accept: text/html\r\nAcc").unwrap();
        assert_eq!(n, 19);
        headers.parse(b"ept: */*\r\n\r\n").unwrap();
        assert_eq!(headers.get("accept"), Some("text/html,*/*"));
    }

    #[test]
    fn whitespace_around_name_is_rejected() {
        let mut headers = Headers::new();
        let err = headers.parse(b"       Host : localhost:42069       \r\n\r\n");
        assert!(matches!(err, Err(ParseError::Header(_))));

        let mut headers = Headers::new();
        assert!(headers.parse(b"Host : localhost\r\n\r\n").is_err());
    }

    #[test]
    fn non_ascii_name_is_rejected() {
        let mut headers = Headers::new();
        let err = headers.parse("H©st: localhost:42069\r\n\r\n".as_bytes());
        assert!(err.is_err());
        assert!(headers.is_empty());
    }

    #[test]
    fn missing_colon_is_rejected() {
        let mut headers = Headers::new();
        assert!(headers.parse(b"Host localhost:42069\r\n\r\n").is_err());
        assert!(headers.parse(b": value\r\n\r\n").is_err());
    }

    #[test]
    fn whitespace_only_line_ends_section() {
        let mut headers = Headers::new();
        let (n, done) = headers.parse(b" \r\n").unwrap();
        assert_eq!(n, 3);
        assert!(done);
    }

    #[test]
    fn value_keeps_inner_spacing() {
        let mut headers = Headers::new();
        headers.parse(b"X-Note:  two spaces  \r\nX-Tight:v\r\n\r\n").unwrap();
        assert_eq!(headers.get("x-note"), Some(" two spaces"));
        assert_eq!(headers.get("x-tight"), Some("v"));
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.names().collect::<Vec<_>>(), vec!["content-type"]);
    }

    #[test]
    fn set_overwrites_and_replace_returns_previous() {
        let mut headers = Headers::new();
        headers.set("Trailer", "a");
        headers.set("trailer", "b");
        assert_eq!(headers.get("Trailer"), Some("b"));

        assert_eq!(headers.replace("TRAILER", "c"), Some("b".to_string()));
        assert_eq!(headers.delete("trailer"), Some("c".to_string()));
        assert!(!headers.contains("trailer"));
        assert_eq!(headers.delete("trailer"), None);
    }
}
