//! Blocking facade for synchronous scripts.
//!
//! The engine is async because the SSH stack is, but the calling
//! convention it automates is a single-threaded, synchronous script.
//! These wrappers own a current-thread runtime and block on each
//! operation; one logical operation is in flight at a time, matching
//! the session ownership model.

use std::path::Path;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::config::{ShellConfig, TransferConfig};
use crate::error::{Error, Result};
use crate::expect::{ExpectOptions, ExpectOutcome, Prompt};
use crate::login::{DuoLogin, LoginDialog, LoginReport};
use crate::ssh::RemoteShell;
use crate::transfer::TransferSession;

fn new_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::io_context("creating tokio runtime", e))
}

/// Block the current thread on one future using a throwaway runtime.
///
/// For one-shot use only: anything that must outlive the call (an open
/// session) needs a wrapper that keeps its runtime, like
/// [`BlockingShell`].
pub fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    Ok(new_runtime()?.block_on(future))
}

/// A blocking wrapper around [`RemoteShell`].
pub struct BlockingShell {
    runtime: Runtime,
    inner: RemoteShell,
}

impl BlockingShell {
    /// Connect and authenticate; see [`RemoteShell::connect`].
    pub fn connect(config: ShellConfig, password: &str) -> Result<Self> {
        let runtime = new_runtime()?;
        let inner = runtime.block_on(RemoteShell::connect(config, password))?;
        Ok(Self { runtime, inner })
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &ShellConfig {
        self.inner.config()
    }

    /// See [`RemoteShell::send`].
    pub fn send(&mut self, text: &str) -> Result<()> {
        self.runtime.block_on(self.inner.send(text))
    }

    /// See [`RemoteShell::send_line`].
    pub fn send_line(&mut self, command: &str) -> Result<()> {
        self.runtime.block_on(self.inner.send_line(command))
    }

    /// See [`RemoteShell::receive`].
    pub fn receive(&mut self) -> Result<String> {
        self.runtime.block_on(self.inner.receive())
    }

    /// See [`RemoteShell::receive_timeout`].
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<String> {
        self.runtime.block_on(self.inner.receive_timeout(timeout))
    }

    /// See [`RemoteShell::send_receive`].
    pub fn send_receive(&mut self, command: &str) -> Result<String> {
        self.runtime.block_on(self.inner.send_receive(command))
    }

    /// See [`RemoteShell::expect`].
    pub fn expect(&mut self, prompt: impl Into<Prompt>) -> Result<ExpectOutcome> {
        self.runtime.block_on(self.inner.expect(prompt))
    }

    /// See [`RemoteShell::expect_with`].
    pub fn expect_with(&mut self, prompt: &Prompt, options: &ExpectOptions) -> Result<ExpectOutcome> {
        self.runtime.block_on(self.inner.expect_with(prompt, options))
    }

    /// See [`RemoteShell::run_login`].
    pub fn run_login(&mut self, dialog: &LoginDialog) -> Result<LoginReport> {
        self.runtime.block_on(self.inner.run_login(dialog))
    }

    /// See [`RemoteShell::login`].
    pub fn login(&mut self, flow: &DuoLogin) -> Result<LoginReport> {
        self.runtime.block_on(self.inner.login(flow))
    }

    /// See [`RemoteShell::close`].
    pub fn close(&mut self) {
        self.runtime.block_on(self.inner.close());
    }
}

/// A blocking wrapper around [`TransferSession`].
pub struct BlockingTransfer {
    runtime: Runtime,
    inner: TransferSession,
}

impl BlockingTransfer {
    /// See [`TransferSession::connect`].
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with(TransferConfig::new(host).port(port))
    }

    /// See [`TransferSession::connect_with`].
    pub fn connect_with(config: TransferConfig) -> Result<Self> {
        let runtime = new_runtime()?;
        let inner = runtime.block_on(TransferSession::connect_with(config))?;
        Ok(Self { runtime, inner })
    }

    /// See [`TransferSession::authenticate`].
    pub fn authenticate(&mut self, user: &str, password: &str) -> Result<()> {
        self.runtime.block_on(self.inner.authenticate(user, password))
    }

    /// See [`TransferSession::upload_directory`].
    pub fn upload_directory(&mut self, local_dir: &Path, remote_dir: &str) -> Result<()> {
        self.runtime
            .block_on(self.inner.upload_directory(local_dir, remote_dir))
    }

    /// See [`TransferSession::download_directory`].
    pub fn download_directory(&mut self, remote_dir: &str, local_dir: &Path) -> Result<()> {
        self.runtime
            .block_on(self.inner.download_directory(remote_dir, local_dir))
    }

    /// See [`TransferSession::make_remote_directory_safe`].
    pub fn make_remote_directory_safe(
        &mut self,
        path: &str,
        mode: u32,
        ignore_existing: bool,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.make_remote_directory_safe(path, mode, ignore_existing))
    }

    /// See [`TransferSession::make_remote_directory_recursive`].
    pub fn make_remote_directory_recursive(&mut self, path: &str) -> Result<bool> {
        self.runtime
            .block_on(self.inner.make_remote_directory_recursive(path))
    }

    /// See [`TransferSession::is_remote_path_directory`].
    pub fn is_remote_path_directory(&mut self, path: &str) -> bool {
        self.runtime.block_on(self.inner.is_remote_path_directory(path))
    }

    /// See [`TransferSession::close`].
    pub fn close(&mut self) {
        self.runtime.block_on(self.inner.close());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_runs_a_future() {
        let value = block_on(async { 40 + 2 }).unwrap();
        assert_eq!(value, 42);
    }
}
