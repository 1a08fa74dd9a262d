//! stdio transport for MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Lines longer than the configured maximum are discarded up to the next
//! newline and reported as [`io::ErrorKind::InvalidData`].
//!
//! The transport has no protocol knowledge. It is generic over its reader and
//! writer so the server loop can be driven from in-memory buffers in tests.

use std::io;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin,
    Stdout,
};

/// Longest input line accepted by default, in bytes.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

const DISCARD_CHUNK_BYTES: u64 = 64 * 1024;

/// A line-delimited MCP transport.
///
/// Defaults to stdin/stdout.
pub struct StdioTransport<R = BufReader<Stdin>, W = Stdout> {
    reader: R,
    writer: W,
    max_line: usize,
}

impl StdioTransport {
    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
            max_line: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary reader and writer.
    pub const fn from_parts(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_line: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Sets the longest accepted input line, excluding the terminator.
    #[must_use]
    pub fn with_max_line_bytes(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Returns the longest accepted input line in bytes.
    #[must_use]
    pub const fn max_line_bytes(&self) -> usize {
        self.max_line
    }

    /// Consumes the transport, returning the reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the input is closed (EOF). Invalid UTF-8 is replaced
    /// with U+FFFD so a bad line reaches the codec instead of ending the loop.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, or an [`io::ErrorKind::InvalidData`]
    /// error if the line is longer than the maximum. In the latter case the
    /// rest of the line has been consumed and the next read starts cleanly.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let limit = u64::try_from(self.max_line).unwrap_or(u64::MAX).saturating_add(1);
        let bytes_read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.len() > self.max_line && buf.last() != Some(&b'\n') {
            self.discard_rest_of_line().await?;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("input line exceeds {} bytes", self.max_line),
            ));
        }

        let mut line = match String::from_utf8(buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Input line is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    async fn discard_rest_of_line(&mut self) -> io::Result<()> {
        let mut scratch = Vec::new();
        loop {
            scratch.clear();
            let n = (&mut self.reader)
                .take(DISCARD_CHUNK_BYTES)
                .read_until(b'\n', &mut scratch)
                .await?;
            if n == 0 || scratch.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }

    /// Writes one already-serialised message, newline terminated, and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn write_line(&mut self, json: &str) -> io::Result<()> {
        // Frames are newline-delimited, so a frame must not contain one
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
