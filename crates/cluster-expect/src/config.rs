//! Configuration types for cluster-expect sessions.
//!
//! Everything deployment-specific lives here: host coordinates, receive
//! tuning, verbosity, and host-key policy. Login prompt text lives in
//! [`crate::login::DuoLogin`], which is also loaded from the same TOML
//! files. Passwords are never part of any configuration type; they are
//! call-time parameters.
//!
//! Configuration is cloned into a session when it connects and is
//! immutable afterwards.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Default receive-buffer capacity in bytes.
///
/// Caps the largest chunk a single `receive` call can return.
pub const DEFAULT_RECV_BUFFER: usize = 4096;

/// Default timeout for a single receive call.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Default settle delay between send and receive in `send_receive`.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Default timeout for establishing the transport connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TERM value for the requested PTY.
pub const DEFAULT_TERM: &str = "xterm-256color";

/// How much of the interactive traffic is echoed through tracing.
///
/// Mirrors the debugging levels an unreliable login flow needs: nothing,
/// raw received output, or output plus expect-loop progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No echo.
    Silent,
    /// Echo each received chunk.
    #[default]
    Output,
    /// Echo received chunks and expect-loop progress.
    Progress,
}

/// Line terminator appended by `send_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n` — what a PTY shell expects.
    #[default]
    Lf,
    /// `\r\n`.
    CrLf,
}

impl LineEnding {
    /// The terminator as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Server host-key handling.
///
/// The default accepts any key with a warning, matching the tolerant
/// posture lab tooling takes toward ever-changing cluster login nodes.
/// Use `RejectUnknown` where that tradeoff is unacceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Accept any server key, logging a warning.
    #[default]
    AcceptAll,
    /// Reject servers whose key is not already trusted out of band.
    RejectUnknown,
}

/// Configuration for an interactive shell session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Hostname of the remote login node.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Username to authenticate as.
    pub username: String,
    /// Receive-buffer capacity in bytes; caps the largest single chunk.
    pub recv_buffer: usize,
    /// Default timeout for a single receive call.
    #[serde(with = "duration_secs")]
    pub recv_timeout: Duration,
    /// Settle delay between send and receive in `send_receive`.
    #[serde(with = "duration_secs")]
    pub settle: Duration,
    /// Timeout for establishing the transport connection.
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Line terminator appended by `send_line`.
    pub line_ending: LineEnding,
    /// Echo level for received traffic.
    pub verbosity: Verbosity,
    /// Server host-key handling.
    pub host_key_policy: HostKeyPolicy,
    /// TERM value for the requested PTY.
    pub term: String,
    /// PTY dimensions (columns, rows).
    pub dimensions: (u16, u16),
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            recv_buffer: DEFAULT_RECV_BUFFER,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            settle: DEFAULT_SETTLE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            line_ending: LineEnding::default(),
            verbosity: Verbosity::default(),
            host_key_policy: HostKeyPolicy::default(),
            term: DEFAULT_TERM.to_string(),
            dimensions: (80, 24),
        }
    }
}

impl ShellConfig {
    /// Create a configuration for a host and user.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the receive-buffer capacity.
    #[must_use]
    pub const fn recv_buffer(mut self, bytes: usize) -> Self {
        self.recv_buffer = bytes;
        self
    }

    /// Set the default receive timeout.
    #[must_use]
    pub const fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the settle delay used by `send_receive`.
    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the verbosity.
    #[must_use]
    pub const fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the host-key policy.
    #[must_use]
    pub const fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// Set the PTY dimensions.
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.dimensions = (cols, rows);
        self
    }

    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        from_toml_str(s)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        from_toml_file(path.as_ref())
    }

    /// Address string for logging.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for a directory transfer session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Hostname of the remote transfer node.
    pub host: String,
    /// SSH port (SFTP rides the same transport).
    pub port: u16,
    /// Timeout for establishing the transport connection.
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Server host-key handling.
    pub host_key_policy: HostKeyPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            host_key_policy: HostKeyPolicy::default(),
        }
    }
}

impl TransferConfig {
    /// Create a configuration for a host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the host-key policy.
    #[must_use]
    pub const fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        from_toml_str(s)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        from_toml_file(path.as_ref())
    }
}

/// Deserialize any of the crate's configuration types from a TOML string.
pub(crate) fn from_toml_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
    toml::from_str(s).map_err(|e| Error::config(e.to_string()))
}

/// Deserialize any of the crate's configuration types from a TOML file.
pub(crate) fn from_toml_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::io_context(format!("reading config file {}", path.display()), e))?;
    from_toml_str(&contents)
}

/// Serde adapter: durations written as (fractional) seconds in TOML.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
