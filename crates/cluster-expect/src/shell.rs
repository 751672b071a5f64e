//! The interactive shell session: send / receive / expect.
//!
//! [`ShellSession`] is written against any duplex byte stream so the
//! engine can be driven over an SSH channel in production and an
//! in-memory stream in tests. It deliberately does NOT frame the stream:
//! `receive` returns whatever was available within its window, and
//! `expect` is the only synchronization primitive layered on top.

use std::borrow::Cow;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::config::{ShellConfig, Verbosity};
use crate::encoding::{decode_utf8_lossy, strip_ansi};
use crate::error::{Error, Result};
use crate::expect::{ExpectOptions, ExpectOutcome, Prompt};

/// An interactive session over one duplex stream.
///
/// The session owns its stream exclusively. Lifecycle: construct around a
/// live stream, use, then [`close`](Self::close) — which is idempotent.
/// Every send/receive after close fails with [`Error::NotConnected`].
pub struct ShellSession<T> {
    stream: T,
    config: ShellConfig,
    closed: bool,
}

impl<T: AsyncRead + AsyncWrite + Unpin> ShellSession<T> {
    /// Wrap a live stream.
    pub fn new(stream: T, config: ShellConfig) -> Self {
        Self {
            stream,
            config,
            closed: false,
        }
    }

    /// The session configuration (immutable once connected).
    #[must_use]
    pub const fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send raw text to the remote. Fire-and-forget: no acknowledgement
    /// is awaited.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        if self.closed {
            return Err(Error::NotConnected);
        }
        self.stream
            .write_all(text.as_bytes())
            .await
            .map_err(|e| Error::io_context("writing to channel", e))?;
        self.stream
            .flush()
            .await
            .map_err(|e| Error::io_context("flushing channel", e))?;
        tracing::trace!(bytes = text.len(), "sent");
        Ok(())
    }

    /// Send a command with the configured line terminator appended.
    pub async fn send_line(&mut self, command: &str) -> Result<()> {
        let data = format!("{command}{}", self.config.line_ending.as_str());
        self.send(&data).await
    }

    /// One receive with the configured default timeout.
    pub async fn receive(&mut self) -> Result<String> {
        self.receive_timeout(self.config.recv_timeout).await
    }

    /// One receive with an explicit timeout.
    ///
    /// Performs a single read of up to the configured buffer capacity and
    /// returns whatever was available — possibly a partial message. This
    /// is NOT a framed read; callers must not assume completeness.
    ///
    /// # Errors
    ///
    /// [`Error::ReadTimeout`] if nothing arrives within `timeout`;
    /// [`Error::Eof`] if the remote closed the channel.
    pub async fn receive_timeout(&mut self, timeout: Duration) -> Result<String> {
        if self.closed {
            return Err(Error::NotConnected);
        }
        let mut buf = vec![0u8; self.config.recv_buffer];
        let n = match tokio::time::timeout(timeout, self.stream.read(&mut buf)).await {
            Ok(Ok(0)) => return Err(Error::Eof),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(Error::io_context("reading from channel", e)),
            Err(_) => return Err(Error::read_timeout(timeout)),
        };

        let decoded = decode_utf8_lossy(&buf[..n]);
        if decoded.had_errors() {
            tracing::debug!(
                replacements = decoded.replacements,
                "received chunk contained invalid UTF-8"
            );
        }
        if self.config.verbosity >= Verbosity::Output {
            tracing::info!(bytes = n, output = %decoded.text, "received");
        }
        Ok(decoded.text)
    }

    /// Send a command, wait the configured settle delay, then receive
    /// once.
    ///
    /// The single receive may return only part of the remote's eventual
    /// output; use [`expect`](Self::expect) to synchronize on a prompt.
    pub async fn send_receive(&mut self, command: &str) -> Result<String> {
        self.send_receive_with(command, self.config.settle, self.config.recv_timeout)
            .await
    }

    /// [`send_receive`](Self::send_receive) with explicit settle delay
    /// and receive timeout.
    pub async fn send_receive_with(
        &mut self,
        command: &str,
        settle: Duration,
        timeout: Duration,
    ) -> Result<String> {
        self.send_line(command).await?;
        tokio::time::sleep(settle).await;
        self.receive_timeout(timeout).await
    }

    /// Wait for a prompt with default [`ExpectOptions`].
    pub async fn expect(&mut self, prompt: impl Into<Prompt>) -> Result<ExpectOutcome> {
        self.expect_with(&prompt.into(), &ExpectOptions::default())
            .await
    }

    /// The synchronization primitive: poll until `prompt` matches a
    /// received chunk or the wall-clock budget runs out.
    ///
    /// Each iteration reads one chunk with `options.recv_timeout` and
    /// tests the prompt against that chunk only — earlier chunks are
    /// discarded, not concatenated. A read timeout on one iteration is
    /// swallowed by explicit policy (nothing this round, keep polling);
    /// any other receive error propagates. The loop sleeps
    /// `options.poll_sleep` between iterations so cancellation can take
    /// effect between reads.
    ///
    /// Failing to match is reported through the outcome flag, never as an
    /// error: on a flaky login node, an unmatched prompt is routine.
    pub async fn expect_with(
        &mut self,
        prompt: &Prompt,
        options: &ExpectOptions,
    ) -> Result<ExpectOutcome> {
        let started = Instant::now();
        let mut last_chunk = String::new();

        loop {
            if self.config.verbosity >= Verbosity::Progress {
                tracing::debug!(
                    pattern = prompt.as_str(),
                    elapsed = ?started.elapsed(),
                    "expect: polling"
                );
            }

            match self.receive_timeout(options.recv_timeout).await {
                Ok(chunk) => last_chunk = chunk,
                // Policy: ignore a single-iteration read timeout and keep
                // polling. Anything else is a real failure and propagates.
                Err(e) if e.is_read_timeout() => {
                    if self.config.verbosity >= Verbosity::Progress {
                        tracing::debug!("expect: nothing received this round");
                    }
                }
                Err(e) => return Err(e),
            }

            let matched = {
                let probe: Cow<'_, str> = if options.strip_ansi {
                    strip_ansi(&last_chunk)
                } else {
                    Cow::Borrowed(last_chunk.as_str())
                };
                prompt.matches(probe.as_ref())
            };

            if matched {
                tracing::debug!(pattern = prompt.as_str(), "expect: matched");
                return Ok(ExpectOutcome::new(last_chunk, true));
            }

            if started.elapsed() >= options.total_timeout {
                tracing::debug!(
                    pattern = prompt.as_str(),
                    budget = ?options.total_timeout,
                    "expect: gave up"
                );
                return Ok(ExpectOutcome::new(last_chunk, false));
            }

            tokio::time::sleep(options.poll_sleep).await;
        }
    }

    /// Release the stream. Idempotent: the second and later calls are
    /// no-ops. Shutdown failures are logged and discarded — release is
    /// best-effort on an already-broken channel.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "channel shutdown failed");
        }
    }

    /// Consume the session and return the underlying stream.
    pub fn into_inner(self) -> T {
        self.stream
    }
}
