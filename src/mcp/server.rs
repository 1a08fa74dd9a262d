//! The stdio server loop.
//!
//! Reads one line, processes it fully, then reads the next. While a request
//! runs, the loop drains that request's progress channel onto the same writer,
//! so every progress frame for a request is written before its response.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, Stdin, Stdout};

use crate::error::DecodeError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::guard::ResponseGuard;
use crate::mcp::progress::{ProgressEvent, ProgressReporter};
use crate::mcp::protocol::{parse_message, JsonRpcError, OutgoingMessage};
use crate::mcp::transport::StdioTransport;

/// The MCP server over a line-delimited transport.
pub struct McpServer<R = BufReader<Stdin>, W = Stdout> {
    dispatcher: Arc<Dispatcher>,
    guard: ResponseGuard,
    transport: StdioTransport<R, W>,
}

impl McpServer {
    /// Creates a server on stdin/stdout.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, guard: ResponseGuard) -> Self {
        Self::with_transport(dispatcher, guard, StdioTransport::new())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server on an arbitrary transport.
    #[must_use]
    pub const fn with_transport(
        dispatcher: Arc<Dispatcher>,
        guard: ResponseGuard,
        transport: StdioTransport<R, W>,
    ) -> Self {
        Self {
            dispatcher,
            guard,
            transport,
        }
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> StdioTransport<R, W> {
        self.transport
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails. A closed output pipe ends the
    /// loop without error.
    pub async fn run(&mut self) -> io::Result<()> {
        match self.run_with_shutdown().await {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::info!("Output closed by client, stopping");
                Ok(())
            }
            other => other,
        }
    }

    /// Processes lines until EOF, without signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve_until_eof(&mut self) -> io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool> {
        let line = match line_result {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("Input closed, shutting down");
                return Ok(true);
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::warn!(error = %e, "Discarding oversized input line");
                let err = DecodeError::Oversized {
                    limit: self.transport.max_line_bytes(),
                };
                let reply = OutgoingMessage::Error(JsonRpcError::from(&err));
                self.transport.write_line(&self.guard.finalize(&reply)).await?;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.process_line(&line).await?;
        Ok(false)
    }

    /// Decodes, dispatches and answers one input line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the transport fails.
    pub async fn process_line(&mut self, line: &str) -> io::Result<()> {
        let msg = match parse_message(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode message");
                let reply = OutgoingMessage::Error(JsonRpcError::from(&e));
                return self.transport.write_line(&self.guard.finalize(&reply)).await;
            }
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let (reporter, mut events) = ProgressReporter::channel();
        let dispatch = dispatcher.dispatch(msg, reporter);
        tokio::pin!(dispatch);

        let reply = loop {
            tokio::select! {
                biased;

                Some(event) = events.recv() => {
                    self.write_progress(&event).await?;
                }

                reply = &mut dispatch => break reply,
            }
        };

        while let Ok(event) = events.try_recv() {
            self.write_progress(&event).await?;
        }

        if let Some(reply) = reply {
            if reply.is_error() {
                tracing::debug!(id = ?reply.id(), "Writing error response");
            }
            self.transport.write_line(&self.guard.finalize(&reply)).await?;
        }

        Ok(())
    }

    async fn write_progress(&mut self, event: &ProgressEvent) -> io::Result<()> {
        let frame = self.guard.finalize(&event.to_notification());
        self.transport.write_line(&frame).await
    }
}
