//! Deadline-bounded line reader.
//!
//! The adapter speaks a line protocol: every reply line ends with `\n`,
//! usually preceded by `\r`. Bytes are accumulated across reads so a line
//! split over several chunks is reassembled, and any bytes after the first
//! terminator are kept for the next call.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::time::Instant;

use crate::transport::Transport;

/// Line terminator byte.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Default maximum wait for a single physical read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Default maximum wait for one complete line.
pub const DEFAULT_LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of one physical read.
const READ_CHUNK: usize = 100;

/// Pause after a failed physical read before retrying.
const RETRY_PAUSE: Duration = Duration::from_millis(10);

/// Buffered line reader over a [`Transport`].
#[derive(Debug)]
pub struct LineReader {
    buffer: BytesMut,
    read_timeout: Duration,
    line_timeout: Duration,
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT, DEFAULT_LINE_TIMEOUT)
    }
}

impl LineReader {
    /// Creates a line reader with the given physical-read and line timeouts.
    #[must_use]
    pub fn new(read_timeout: Duration, line_timeout: Duration) -> Self {
        Self {
            buffer: BytesMut::new(),
            read_timeout,
            line_timeout,
        }
    }

    /// Sets the maximum wait for a single physical read.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Sets the maximum wait for one complete line.
    pub fn set_line_timeout(&mut self, timeout: Duration) {
        self.line_timeout = timeout;
    }

    /// Returns the physical read timeout.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the line timeout.
    #[must_use]
    pub const fn line_timeout(&self) -> Duration {
        self.line_timeout
    }

    /// Feeds data into the buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Takes the next complete line out of the buffer, if there is one.
    ///
    /// A trailing `\r` is stripped.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == LINE_TERMINATOR)?;
        let mut line = self.buffer.split_to(end);
        self.buffer.advance(1);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Reads one line from the transport.
    ///
    /// Returns `None` if no complete line arrived within the line timeout.
    /// Transport errors are logged and the wait continues; only the deadline
    /// ends it.
    pub async fn read_line<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<String> {
        if let Some(line) = self.next_line() {
            return Some(line);
        }

        let deadline = Instant::now() + self.line_timeout;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("timeout reading line after {:?}", self.line_timeout);
                return None;
            }

            let wait = self.read_timeout.min(deadline - now);
            match tokio::time::timeout(wait, transport.receive(&mut buf)).await {
                Err(_elapsed) => {}
                Ok(Err(e)) => {
                    tracing::warn!("error reading line: {}", e);
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Ok(Ok(n)) => {
                    self.buffer.extend_from_slice(&buf[..n]);
                    if let Some(line) = self.next_line() {
                        return Some(line);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::*;
    use crate::transport::mock::{MockTransport, Step};

    #[test]
    fn test_next_line_strips_carriage_return() {
        let mut reader = LineReader::default();
        reader.feed(b"OK\r\nEVER 1.2.10\npartial");

        assert_eq!(reader.next_line().as_deref(), Some("OK"));
        assert_eq!(reader.next_line().as_deref(), Some("EVER 1.2.10"));
        assert_eq!(reader.next_line(), None);
        assert_eq!(reader.buffered(), "partial".len());
    }

    #[test]
    fn test_next_line_keeps_empty_lines() {
        let mut reader = LineReader::default();
        reader.feed(b"\r\n\nx\n");

        assert_eq!(reader.next_line().as_deref(), Some(""));
        assert_eq!(reader.next_line().as_deref(), Some(""));
        assert_eq!(reader.next_line().as_deref(), Some("x"));
        assert_eq!(reader.buffered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_line_reassembled_across_chunks() {
        let mut transport = MockTransport::new();
        transport.push("SKV");
        transport.push_step(Step::Delay(Duration::from_millis(200)));
        transport.push("ER\r");
        transport.push("\nEVER 1.2");
        transport.push(".10\r\nOK");

        let mut reader = LineReader::default();
        assert_eq!(
            reader.read_line(&mut transport).await.as_deref(),
            Some("SKVER")
        );
        assert_eq!(
            reader.read_line(&mut transport).await.as_deref(),
            Some("EVER 1.2.10")
        );
        // "OK" has no terminator yet
        assert_eq!(reader.read_line(&mut transport).await, None);
        assert_eq!(reader.buffered(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_lines_need_no_read() {
        let mut transport = MockTransport::replying("a\r\nb\r\nc\r\n");
        let mut reader = LineReader::default();

        assert_eq!(reader.read_line(&mut transport).await.as_deref(), Some("a"));
        // Remaining lines come from the buffer even with a closed stream
        let mut closed = MockTransport::new().disconnected();
        assert_eq!(reader.read_line(&mut closed).await.as_deref(), Some("b"));
        assert_eq!(reader.read_line(&mut closed).await.as_deref(), Some("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_none_after_line_deadline() {
        let mut transport = MockTransport::replying("no terminator");
        let mut reader = LineReader::new(Duration::from_millis(100), Duration::from_secs(2));

        let start = Instant::now();
        assert_eq!(reader.read_line(&mut transport).await, None);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));

        // Unterminated suffix survives for the next call
        transport.push(" here\r\n");
        assert_eq!(
            reader.read_line(&mut transport).await.as_deref(),
            Some("no terminator here")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_chunk_outlives_read_timeout() {
        let mut transport = MockTransport::new();
        transport.push_step(Step::Delay(Duration::from_millis(1500)));
        transport.push("EVENT 25 FE80:0000:0000:0000:021D:1290:0003:C890\r\n");

        let mut reader = LineReader::new(Duration::from_millis(100), Duration::from_secs(2));
        let line = reader.read_line(&mut transport).await;
        assert_eq!(
            line.as_deref(),
            Some("EVENT 25 FE80:0000:0000:0000:021D:1290:0003:C890")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let mut transport = MockTransport::new();
        transport.push_step(Step::Fail(io::ErrorKind::Interrupted));
        transport.push_step(Step::Fail(io::ErrorKind::TimedOut));
        transport.push_step(Step::Data(Bytes::from_static(b"OK\r\n")));

        let mut reader = LineReader::default();
        assert_eq!(
            reader.read_line(&mut transport).await.as_deref(),
            Some("OK")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_adjusted_line_timeout_applies() {
        let mut transport = MockTransport::new();
        let mut reader = LineReader::default();
        reader.set_line_timeout(Duration::from_millis(300));
        assert_eq!(reader.line_timeout(), Duration::from_millis(300));

        let start = Instant::now();
        assert_eq!(reader.read_line(&mut transport).await, None);
        assert!(start.elapsed() < DEFAULT_LINE_TIMEOUT);
    }
}
