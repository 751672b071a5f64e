//! SFTP-backed directory transfer session.
//!
//! A [`TransferSession`] is independent of any shell session even when
//! pointed at the same host: it owns its own transport and its own sftp
//! channel. Release order on close is channel before transport.

use std::path::Path;

use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::TransferConfig;
use crate::error::{Error, RemoteFsErrorKind, Result};
use crate::ssh::SshConnection;
use crate::transfer::remote::{self, RemoteFs};

/// Map an sftp client error onto the crate taxonomy.
fn sftp_error(path: &str, e: &russh_sftp::client::error::Error) -> Error {
    let kind = match e {
        russh_sftp::client::error::Error::Status(status)
            if status.status_code == StatusCode::NoSuchFile =>
        {
            RemoteFsErrorKind::NotFound
        }
        _ => RemoteFsErrorKind::Other,
    };
    Error::remote_fs(path, kind, e.to_string())
}

/// A directory-sync session over the `sftp` subsystem.
pub struct TransferSession {
    config: TransferConfig,
    connection: Option<SshConnection>,
    sftp: Option<SftpSession>,
}

impl std::fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSession")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("authenticated", &self.sftp.is_some())
            .finish()
    }
}

impl TransferSession {
    /// Open the transport to `host:port` (no authentication yet).
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with(TransferConfig::new(host).port(port)).await
    }

    /// Open the transport described by `config`.
    pub async fn connect_with(config: TransferConfig) -> Result<Self> {
        let connection = SshConnection::connect(
            &config.host,
            config.port,
            config.connect_timeout,
            config.host_key_policy,
        )
        .await?;
        Ok(Self {
            config,
            connection: Some(connection),
            sftp: None,
        })
    }

    /// Authenticate (password only) and open the sftp channel.
    ///
    /// The password is used for this call only and not retained.
    pub async fn authenticate(&mut self, user: &str, password: &str) -> Result<()> {
        let connection = self.connection.as_mut().ok_or(Error::NotConnected)?;
        connection.authenticate_password(user, password).await?;
        let sftp = connection.open_sftp().await?;
        self.sftp = Some(sftp);
        tracing::info!(host = %self.config.host, user, "transfer session ready");
        Ok(())
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Whether the sftp channel is open.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.sftp.is_some()
    }

    /// Recursively mirror a local directory tree to the remote.
    /// See [`remote::upload_directory`].
    pub async fn upload_directory(&mut self, local_dir: &Path, remote_dir: &str) -> Result<()> {
        remote::upload_directory(self, local_dir, remote_dir).await
    }

    /// Recursively mirror a remote directory tree to the local
    /// filesystem. See [`remote::download_directory`].
    pub async fn download_directory(&mut self, remote_dir: &str, local_dir: &Path) -> Result<()> {
        remote::download_directory(self, remote_dir, local_dir).await
    }

    /// Create one remote directory, optionally tolerating its existence.
    /// See [`remote::make_remote_directory_safe`].
    pub async fn make_remote_directory_safe(
        &mut self,
        path: &str,
        mode: u32,
        ignore_existing: bool,
    ) -> Result<()> {
        remote::make_remote_directory_safe(self, path, mode, ignore_existing).await
    }

    /// Ensure every component of `path` exists; returns whether any
    /// directory was newly created.
    /// See [`remote::make_remote_directory_recursive`].
    pub async fn make_remote_directory_recursive(&mut self, path: &str) -> Result<bool> {
        remote::make_remote_directory_recursive(self, path).await
    }

    /// Whether a remote path stats as a directory; nonexistent is
    /// `false`, not an error.
    pub async fn is_remote_path_directory(&mut self, path: &str) -> bool {
        remote::is_remote_path_directory(self, path).await
    }

    /// Release the sftp channel, then the transport, in that order.
    /// Idempotent.
    pub async fn close(&mut self) {
        if let Some(sftp) = self.sftp.take() {
            if let Err(e) = sftp.close().await {
                tracing::debug!(error = %e, "sftp channel close failed");
            }
        }
        if let Some(mut connection) = self.connection.take() {
            connection.disconnect().await;
        }
    }

    fn sftp(&mut self) -> Result<&mut SftpSession> {
        self.sftp.as_mut().ok_or(Error::NotConnected)
    }
}

impl Drop for TransferSession {
    fn drop(&mut self) {
        // Explicit close() is the contract; dropping the handle tears
        // the connection down without the protocol goodbye.
        if self.connection.is_some() {
            tracing::warn!(host = %self.config.host, "TransferSession dropped without close()");
        }
    }
}

impl RemoteFs for TransferSession {
    async fn put_file(&mut self, local: &Path, remote: &str) -> Result<()> {
        let data = tokio::fs::read(local)
            .await
            .map_err(|e| Error::io_context(format!("reading {}", local.display()), e))?;

        let sftp = self.sftp()?;
        let mut file = sftp.create(remote).await.map_err(|e| sftp_error(remote, &e))?;
        file.write_all(&data)
            .await
            .map_err(|e| Error::remote_fs(remote, RemoteFsErrorKind::Other, e.to_string()))?;
        file.shutdown()
            .await
            .map_err(|e| Error::remote_fs(remote, RemoteFsErrorKind::Other, e.to_string()))?;
        Ok(())
    }

    async fn get_file(&mut self, remote: &str, local: &Path) -> Result<()> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_context(format!("creating {}", parent.display()), e))?;
        }

        let sftp = self.sftp()?;
        let mut file = sftp.open(remote).await.map_err(|e| sftp_error(remote, &e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| Error::remote_fs(remote, RemoteFsErrorKind::Other, e.to_string()))?;

        tokio::fs::write(local, data)
            .await
            .map_err(|e| Error::io_context(format!("writing {}", local.display()), e))?;
        Ok(())
    }

    async fn make_dir(&mut self, path: &str, mode: u32) -> Result<()> {
        let sftp = self.sftp()?;
        match sftp.create_dir(path).await {
            Ok(()) => {
                // SFTP v3 mkdir carries no mode; apply it after the fact,
                // best effort.
                let attrs = FileAttributes {
                    permissions: Some(mode),
                    ..Default::default()
                };
                if let Err(e) = sftp.set_metadata(path, attrs).await {
                    tracing::debug!(path, error = %e, "could not set directory mode");
                }
                Ok(())
            }
            Err(e) => {
                // Servers answer a generic failure for an existing path;
                // classify by a follow-up stat so the idempotent-mkdir
                // policy can key off the AlreadyExists kind.
                let exists_as_dir =
                    matches!(sftp.metadata(path).await, Ok(attrs) if attrs.file_type().is_dir());
                if exists_as_dir {
                    Err(Error::already_exists(path))
                } else {
                    Err(sftp_error(path, &e))
                }
            }
        }
    }

    async fn enter_dir(&mut self, path: &str) -> Result<()> {
        // The protocol has no cwd; entering is probing that the path
        // exists and is a directory.
        let sftp = self.sftp()?;
        match sftp.metadata(path).await {
            Ok(attrs) if attrs.file_type().is_dir() => Ok(()),
            Ok(_) => Err(Error::remote_fs(
                path,
                RemoteFsErrorKind::Other,
                "not a directory",
            )),
            Err(e) => Err(sftp_error(path, &e)),
        }
    }

    async fn list_dir(&mut self, path: &str) -> Result<Vec<String>> {
        let sftp = self.sftp()?;
        let entries = sftp.read_dir(path).await.map_err(|e| sftp_error(path, &e))?;
        Ok(entries
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect())
    }

    async fn is_dir(&mut self, path: &str) -> bool {
        match self.sftp.as_mut() {
            Some(sftp) => matches!(sftp.metadata(path).await, Ok(attrs) if attrs.file_type().is_dir()),
            None => false,
        }
    }

    async fn canonicalize(&mut self, path: &str) -> Result<String> {
        let sftp = self.sftp()?;
        sftp.canonicalize(path).await.map_err(|e| sftp_error(path, &e))
    }
}
