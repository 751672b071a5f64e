//! Authenticated SSH transport.
//!
//! One [`SshConnection`] is one russh client handle. Authentication is
//! password-only by design: the institutional login flows this crate
//! targets reject key and agent authentication on their two-factor
//! gateways, so neither is attempted.

use std::sync::Arc;
use std::time::Duration;

use russh::client;
use russh::keys::PublicKey;

use crate::config::HostKeyPolicy;
use crate::error::{Error, Result};
use crate::ssh::channel::ShellStream;

/// russh client handler applying the configured host-key policy.
pub(crate) struct ClientHandler {
    policy: HostKeyPolicy,
    host: String,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.policy {
            HostKeyPolicy::AcceptAll => {
                tracing::warn!(
                    host = %self.host,
                    "accepting server host key without verification"
                );
                Ok(true)
            }
            HostKeyPolicy::RejectUnknown => {
                tracing::debug!(
                    host = %self.host,
                    key = ?server_public_key,
                    "rejecting unknown host key"
                );
                Ok(false)
            }
        }
    }
}

/// An authenticated (or soon-to-be) SSH transport connection.
///
/// Owns exactly one russh handle. [`disconnect`](Self::disconnect) is
/// idempotent; channels opened from this connection die with it.
pub struct SshConnection {
    handle: Option<client::Handle<ClientHandler>>,
    host: String,
    port: u16,
}

impl std::fmt::Debug for SshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl SshConnection {
    /// Open the transport to `host:port`.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] when the host is unreachable, the handshake
    /// fails, or `connect_timeout` elapses first.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        policy: HostKeyPolicy,
    ) -> Result<Self> {
        let config = Arc::new(client::Config::default());
        let handler = ClientHandler {
            policy,
            host: host.to_string(),
        };

        tracing::info!(host, port, "connecting to SSH server");

        let handle = tokio::time::timeout(
            connect_timeout,
            client::connect(config, (host, port), handler),
        )
        .await
        .map_err(|_| {
            Error::connection(host, port, format!("connect timed out after {connect_timeout:?}"))
        })?
        .map_err(|e| Error::connection(host, port, e.to_string()))?;

        Ok(Self {
            handle: Some(handle),
            host: host.to_string(),
            port,
        })
    }

    /// Authenticate with a password. No other method is attempted.
    ///
    /// # Errors
    ///
    /// [`Error::Authentication`] when the server rejects the credentials
    /// or the exchange fails.
    pub async fn authenticate_password(&mut self, user: &str, password: &str) -> Result<()> {
        let host = self.host.clone();
        let handle = self.handle_mut()?;

        let auth = handle
            .authenticate_password(user, password)
            .await
            .map_err(|e| Error::authentication(user, e.to_string()))?;

        if auth.success() {
            tracing::info!(user, host = %host, "password authentication succeeded");
            Ok(())
        } else {
            Err(Error::authentication(user, "password rejected by server"))
        }
    }

    /// Open a session channel with a PTY and an interactive shell.
    pub async fn open_shell(
        &mut self,
        term: &str,
        cols: u16,
        rows: u16,
        buffer_capacity: usize,
    ) -> Result<ShellStream> {
        let handle = self.handle_mut()?;
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::channel(format!("opening session channel: {e}")))?;

        let mut stream = ShellStream::new(channel, buffer_capacity);
        stream.request_pty(term, cols, rows).await?;
        stream.request_shell().await?;

        tracing::debug!(host = %self.host, term, "interactive shell ready");
        Ok(stream)
    }

    /// Open a session channel with the `sftp` subsystem.
    pub async fn open_sftp(&mut self) -> Result<russh_sftp::client::SftpSession> {
        let handle = self.handle_mut()?;
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::channel(format!("opening session channel: {e}")))?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::channel(format!("requesting sftp subsystem: {e}")))?;

        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::channel(format!("initializing sftp session: {e}")))?;

        tracing::debug!(host = %self.host, "sftp channel ready");
        Ok(sftp)
    }

    /// Whether the transport is still held.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// The remote host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The remote port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Release the transport. Idempotent; a failed goodbye is discarded.
    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await;
            tracing::debug!(host = %self.host, "transport disconnected");
        }
    }

    fn handle_mut(&mut self) -> Result<&mut client::Handle<ClientHandler>> {
        self.handle.as_mut().ok_or(Error::NotConnected)
    }
}
