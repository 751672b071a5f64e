//! The SSH-bound interactive shell session.
//!
//! [`RemoteShell`] ties the generic [`ShellSession`] engine to a live,
//! password-authenticated SSH channel and keeps the transport alive for
//! the channel's lifetime. Release order on close is channel first, then
//! transport.

use std::time::Duration;

use crate::config::ShellConfig;
use crate::error::Result;
use crate::expect::{ExpectOptions, ExpectOutcome, Prompt};
use crate::login::{DuoLogin, LoginDialog, LoginReport};
use crate::shell::ShellSession;
use crate::ssh::channel::ShellStream;
use crate::ssh::connection::SshConnection;

/// An interactive shell over an authenticated SSH connection.
pub struct RemoteShell {
    connection: SshConnection,
    session: ShellSession<ShellStream>,
    closed: bool,
}

impl RemoteShell {
    /// Connect, authenticate with the password, and start an interactive
    /// shell with a PTY.
    ///
    /// The password is used for this call only and not retained. On any
    /// failure after the transport opens, the transport is released
    /// before the error returns.
    pub async fn connect(config: ShellConfig, password: &str) -> Result<Self> {
        let mut connection = SshConnection::connect(
            &config.host,
            config.port,
            config.connect_timeout,
            config.host_key_policy,
        )
        .await?;

        if let Err(e) = connection
            .authenticate_password(&config.username, password)
            .await
        {
            connection.disconnect().await;
            return Err(e);
        }

        let stream = match connection
            .open_shell(
                &config.term,
                config.dimensions.0,
                config.dimensions.1,
                config.recv_buffer,
            )
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                connection.disconnect().await;
                return Err(e);
            }
        };

        Ok(Self {
            connection,
            session: ShellSession::new(stream, config),
            closed: false,
        })
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &ShellConfig {
        self.session.config()
    }

    /// Direct access to the underlying engine.
    pub fn session_mut(&mut self) -> &mut ShellSession<ShellStream> {
        &mut self.session
    }

    /// See [`ShellSession::send`].
    pub async fn send(&mut self, text: &str) -> Result<()> {
        self.session.send(text).await
    }

    /// See [`ShellSession::send_line`].
    pub async fn send_line(&mut self, command: &str) -> Result<()> {
        self.session.send_line(command).await
    }

    /// See [`ShellSession::receive`].
    pub async fn receive(&mut self) -> Result<String> {
        self.session.receive().await
    }

    /// See [`ShellSession::receive_timeout`].
    pub async fn receive_timeout(&mut self, timeout: Duration) -> Result<String> {
        self.session.receive_timeout(timeout).await
    }

    /// See [`ShellSession::send_receive`].
    pub async fn send_receive(&mut self, command: &str) -> Result<String> {
        self.session.send_receive(command).await
    }

    /// See [`ShellSession::expect`].
    pub async fn expect(&mut self, prompt: impl Into<Prompt>) -> Result<ExpectOutcome> {
        self.session.expect(prompt).await
    }

    /// See [`ShellSession::expect_with`].
    pub async fn expect_with(
        &mut self,
        prompt: &Prompt,
        options: &ExpectOptions,
    ) -> Result<ExpectOutcome> {
        self.session.expect_with(prompt, options).await
    }

    /// Run a login dialog. See [`ShellSession::run_login`].
    pub async fn run_login(&mut self, dialog: &LoginDialog) -> Result<LoginReport> {
        self.session.run_login(dialog).await
    }

    /// Run the configured two-factor flow for this session's user.
    ///
    /// Renders `flow` against the configured username and executes it.
    /// Check `LoginReport::success`; an unmatched prompt is an outcome,
    /// not an error.
    pub async fn login(&mut self, flow: &DuoLogin) -> Result<LoginReport> {
        let user = self.session.config().username.clone();
        let dialog = flow.dialog(&user)?;
        self.run_login(&dialog).await
    }

    /// Release the channel, then the transport. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.session.close().await;
        self.connection.disconnect().await;
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for RemoteShell {
    fn drop(&mut self) {
        // Explicit close() is the contract; dropping the russh handle
        // tears the connection down without the protocol goodbye.
        if !self.closed {
            tracing::warn!(
                host = %self.connection.host(),
                "RemoteShell dropped without close()"
            );
        }
    }
}
