//! Growable read buffer for incremental parsing.
//!
//! Bytes are appended at the write cursor and parsed bytes are compacted out
//! of the front, so the parser always sees the unparsed tail starting at
//! index zero. Storage doubles when full, up to an optional limit.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::RequestError;

/// Default starting capacity of a request buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Byte buffer with a write cursor and amortized-doubling growth.
#[derive(Debug)]
pub struct ReadBuffer {
    storage: Vec<u8>,
    filled: usize,
    limit: usize,
}

impl ReadBuffer {
    /// Create a buffer that starts at `capacity` bytes and grows without bound.
    pub fn new(capacity: usize) -> Self {
        Self::with_limit(capacity, usize::MAX)
    }

    /// Create a buffer that never grows past `limit` bytes.
    pub fn with_limit(capacity: usize, limit: usize) -> Self {
        let capacity = capacity.clamp(1, limit.max(1));
        Self {
            storage: vec![0; capacity],
            filled: 0,
            limit,
        }
    }

    /// The unparsed bytes, starting at the front.
    pub fn filled(&self) -> &[u8] {
        &self.storage[..self.filled]
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Current size of the backing storage.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Append bytes, growing the storage as needed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), RequestError> {
        while self.storage.len() - self.filled < bytes.len() {
            self.grow()?;
        }
        self.storage[self.filled..self.filled + bytes.len()].copy_from_slice(bytes);
        self.filled += bytes.len();
        Ok(())
    }

    /// Drop `n` parsed bytes from the front and shift the rest down.
    pub fn take_parsed(&mut self, n: usize) {
        let n = n.min(self.filled);
        self.storage.copy_within(n..self.filled, 0);
        self.filled -= n;
    }

    /// Read once from `reader` into the free space.
    ///
    /// Returns the number of bytes read; zero means end of stream.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> Result<usize, RequestError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.filled == self.storage.len() {
            self.grow()?;
        }
        let n = reader.read(&mut self.storage[self.filled..]).await?;
        self.filled += n;
        Ok(n)
    }

    fn grow(&mut self) -> Result<(), RequestError> {
        let current = self.storage.len();
        if current >= self.limit {
            return Err(RequestError::BufferLimit { limit: self.limit });
        }
        let next = current.saturating_mul(2).min(self.limit);
        self.storage.resize(next, 0);
        Ok(())
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_when_full() {
        let mut buffer = ReadBuffer::new(4);
        buffer.feed(b"abcd").unwrap();
        assert_eq!(buffer.capacity(), 4);

        buffer.feed(b"e").unwrap();
        assert_eq!(buffer.capacity(), 8);
        buffer.feed(b"fghijklmn").unwrap();
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.filled(), b"abcdefghijklmn");
    }

    #[test]
    fn take_parsed_compacts_to_front() {
        let mut buffer = ReadBuffer::new(16);
        buffer.feed(b"GET / HTTP/1.1\r\n").unwrap();
        buffer.take_parsed(6);
        assert_eq!(buffer.filled(), b"HTTP/1.1\r\n");
        assert_eq!(buffer.len(), 10);

        buffer.take_parsed(100);
        assert!(buffer.is_empty());
    }

    #[test]
    fn growth_stops_at_limit() {
        let mut buffer = ReadBuffer::with_limit(4, 6);
        buffer.feed(b"abcdef").unwrap();
        assert_eq!(buffer.capacity(), 6);

        let err = buffer.feed(b"g").unwrap_err();
        assert!(matches!(err, RequestError::BufferLimit { limit: 6 }));
        assert_eq!(buffer.filled(), b"abcdef");
    }

    #[tokio::test]
    async fn fill_from_reads_into_free_space() {
        let mut buffer = ReadBuffer::new(2);
        let mut source: &[u8] = b"hello";

        assert_eq!(buffer.fill_from(&mut source).await.unwrap(), 2);
        assert_eq!(buffer.fill_from(&mut source).await.unwrap(), 2);
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.fill_from(&mut source).await.unwrap(), 1);
        assert_eq!(buffer.filled(), b"hello");
        assert_eq!(buffer.fill_from(&mut source).await.unwrap(), 0);
    }
}
