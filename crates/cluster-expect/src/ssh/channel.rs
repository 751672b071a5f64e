//! Async I/O over one SSH channel.
//!
//! Wraps a russh [`Channel`] in `AsyncRead`/`AsyncWrite` so the generic
//! [`ShellSession`](crate::shell::ShellSession) engine can drive it like
//! any other stream. Stderr (extended data 1) is merged into the output
//! stream: an interactive PTY shell interleaves them anyway.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::{Error, Result};

/// Channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Eof,
    Closed,
}

/// An SSH channel exposed as a duplex byte stream.
pub struct ShellStream {
    /// The underlying russh channel.
    channel: russh::Channel<russh::client::Msg>,
    /// Data received but not yet read by the caller.
    read_buffer: VecDeque<u8>,
    /// Current state.
    state: StreamState,
    /// Whether EOF has been received from the remote.
    eof_received: bool,
}

impl std::fmt::Debug for ShellStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellStream")
            .field("state", &self.state)
            .field("read_buffer_len", &self.read_buffer.len())
            .field("eof_received", &self.eof_received)
            .finish()
    }
}

impl ShellStream {
    /// Wrap a freshly opened channel.
    #[must_use]
    pub fn new(channel: russh::Channel<russh::client::Msg>, buffer_capacity: usize) -> Self {
        Self {
            channel,
            read_buffer: VecDeque::with_capacity(buffer_capacity),
            state: StreamState::Open,
            eof_received: false,
        }
    }

    /// Whether the remote has sent EOF or closed the channel.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof_received || self.state != StreamState::Open
    }

    /// Request a PTY on this channel.
    pub async fn request_pty(&mut self, term: &str, cols: u16, rows: u16) -> Result<()> {
        self.channel
            .request_pty(false, term, cols.into(), rows.into(), 0, 0, &[])
            .await
            .map_err(|e| Error::channel(format!("PTY request failed: {e}")))
    }

    /// Request an interactive shell on this channel.
    pub async fn request_shell(&mut self) -> Result<()> {
        self.channel
            .request_shell(false)
            .await
            .map_err(|e| Error::channel(format!("shell request failed: {e}")))
    }

    /// Close the channel explicitly.
    pub async fn close(&mut self) -> Result<()> {
        self.state = StreamState::Closed;
        self.channel
            .close()
            .await
            .map_err(|e| Error::channel(format!("channel close failed: {e}")))
    }
}

impl AsyncRead for ShellStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        // Serve buffered data first.
        if !self.read_buffer.is_empty() {
            let len = std::cmp::min(buf.remaining(), self.read_buffer.len());
            let data: Vec<u8> = self.read_buffer.drain(..len).collect();
            buf.put_slice(&data);
            return Poll::Ready(Ok(()));
        }

        // EOF/closed reads as zero bytes.
        if self.eof_received || self.state == StreamState::Closed {
            return Poll::Ready(Ok(()));
        }

        let this = self.get_mut();

        let wait_future = this.channel.wait();
        tokio::pin!(wait_future);

        match wait_future.poll(cx) {
            Poll::Ready(Some(msg)) => match msg {
                russh::ChannelMsg::Data { data } => {
                    let len = std::cmp::min(buf.remaining(), data.len());
                    buf.put_slice(&data[..len]);
                    if len < data.len() {
                        this.read_buffer.extend(&data[len..]);
                    }
                    Poll::Ready(Ok(()))
                }
                russh::ChannelMsg::ExtendedData { data, ext } => {
                    // ext 1 is stderr; merge it into the output stream.
                    if ext == 1 {
                        let len = std::cmp::min(buf.remaining(), data.len());
                        buf.put_slice(&data[..len]);
                        if len < data.len() {
                            this.read_buffer.extend(&data[len..]);
                        }
                        Poll::Ready(Ok(()))
                    } else {
                        cx.waker().wake_by_ref();
                        Poll::Pending
                    }
                }
                russh::ChannelMsg::Eof => {
                    this.eof_received = true;
                    this.state = StreamState::Eof;
                    Poll::Ready(Ok(()))
                }
                russh::ChannelMsg::Close => {
                    this.state = StreamState::Closed;
                    Poll::Ready(Ok(()))
                }
                _ => {
                    // Status messages; keep waiting for data.
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            },
            Poll::Ready(None) => {
                this.state = StreamState::Closed;
                Poll::Ready(Ok(()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncWrite for ShellStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if this.state == StreamState::Closed {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "channel is closed",
            )));
        }

        let data_future = this.channel.data(buf);
        tokio::pin!(data_future);

        match data_future.poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(buf.len())),
            Poll::Ready(Err(e)) => Poll::Ready(Err(io::Error::other(format!(
                "SSH write error: {e}"
            )))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // SSH channels have no explicit flush.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        let eof_future = this.channel.eof();
        tokio::pin!(eof_future);

        match eof_future.poll(cx) {
            Poll::Ready(Ok(())) => {
                this.state = StreamState::Eof;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(io::Error::other(format!(
                "SSH shutdown error: {e}"
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}
