//! Error types for cluster-expect.
//!
//! One crate-level [`Error`] enum covers both session flavors. The design
//! principle: network-origin failures surface to the caller; the only
//! swallowed conditions are the two narrowly-scoped policies named in the
//! modules that apply them (single-iteration read timeouts inside the
//! expect loop, and "already exists" during idempotent remote mkdir).

use std::time::Duration;

use thiserror::Error;

/// Classification of a remote filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFsErrorKind {
    /// The path already exists (only ever reported for directory creation).
    AlreadyExists,
    /// The path does not exist.
    NotFound,
    /// Anything else: stat, transfer, or listing failure.
    Other,
}

impl std::fmt::Display for RemoteFsErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "already exists"),
            Self::NotFound => write!(f, "not found"),
            Self::Other => write!(f, "operation failed"),
        }
    }
}

/// The error type for all cluster-expect operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote host could not be reached or the handshake failed.
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connection {
        /// The host that could not be connected to.
        host: String,
        /// The port that was used.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// The server rejected the presented credentials.
    #[error("authentication failed for user '{user}': {reason}")]
    Authentication {
        /// The user that failed to authenticate.
        user: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Nothing arrived within a receive window.
    ///
    /// Routine inside the expect loop (where it is swallowed by policy),
    /// surfaced to the caller from direct `receive` calls.
    #[error("no data received within {duration:?}")]
    ReadTimeout {
        /// The receive window that elapsed.
        duration: Duration,
    },

    /// An operation was attempted on a session that is not connected
    /// (never connected, or already closed).
    #[error("session is not connected")]
    NotConnected,

    /// The remote side closed the channel.
    #[error("channel closed by remote")]
    Eof,

    /// A channel-level request (PTY, shell, subsystem, write) failed.
    #[error("channel error: {reason}")]
    Channel {
        /// The reason for the channel error.
        reason: String,
    },

    /// A remote filesystem operation failed.
    #[error("remote path '{path}' {kind}: {reason}")]
    RemoteFs {
        /// The remote path involved.
        path: String,
        /// Failure classification.
        kind: RemoteFsErrorKind,
        /// The reason for the failure.
        reason: String,
    },

    /// A local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A local I/O error with operation context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Text decoding failed.
    #[error("encoding error: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Configuration is missing or malformed.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An invalid prompt regex.
    #[error("invalid prompt pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type alias for cluster-expect operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    pub fn connection(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Create a read-timeout error.
    #[must_use]
    pub const fn read_timeout(duration: Duration) -> Self {
        Self::ReadTimeout { duration }
    }

    /// Create a channel error.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    /// Create a remote filesystem error.
    pub fn remote_fs(
        path: impl Into<String>,
        kind: RemoteFsErrorKind,
        reason: impl Into<String>,
    ) -> Self {
        Self::RemoteFs {
            path: path.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// Create an "already exists" remote filesystem error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::remote_fs(path, RemoteFsErrorKind::AlreadyExists, "directory exists")
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Check if this is a read-timeout error.
    #[must_use]
    pub const fn is_read_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout { .. })
    }

    /// Check if this is an EOF error.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Check if this is an "already exists" remote filesystem error.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::RemoteFs {
                kind: RemoteFsErrorKind::AlreadyExists,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_display() {
        let err = Error::connection("login.example.edu", 22, "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("login.example.edu:22"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn authentication_display() {
        let err = Error::authentication("alice", "password rejected");
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn read_timeout_predicate() {
        let err = Error::read_timeout(Duration::from_millis(300));
        assert!(err.is_read_timeout());
        assert!(!err.is_already_exists());
        assert!(!Error::NotConnected.is_read_timeout());
    }

    #[test]
    fn already_exists_predicate() {
        let err = Error::already_exists("/scratch/run1");
        assert!(err.is_already_exists());
        assert!(err.to_string().contains("/scratch/run1"));

        let other = Error::remote_fs("/scratch/run1", RemoteFsErrorKind::Other, "stat failed");
        assert!(!other.is_already_exists());
    }

    #[test]
    fn io_with_context_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io_context("reading local source tree", io_err);
        let msg = err.to_string();
        assert!(msg.contains("reading local source tree"));
        assert!(msg.contains("file not found"));
    }
}
