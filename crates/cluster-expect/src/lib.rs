//! cluster-expect: send/expect automation for remote HPC shells.
//!
//! This crate drives interactive shells on remote clusters over SSH and
//! mirrors directory trees over SFTP. It was built for scripting brittle
//! institutional login flows — password authentication followed by a
//! two-factor banner — and for moving job inputs and outputs around
//! them.
//!
//! # Components
//!
//! - **Shell session** — [`ShellSession`] is the send/receive/expect
//!   engine over any duplex stream; [`RemoteShell`] binds it to an
//!   authenticated SSH channel with a PTY.
//! - **Login dialogs** — [`LoginDialog`]/[`DuoLogin`] make the
//!   two-factor handshake a data-driven sequence of (expect, send)
//!   steps; institution-specific prompt text lives in configuration.
//! - **Directory transfer** — [`TransferSession`] recursively mirrors a
//!   directory tree in either direction with idempotent remote mkdir.
//! - **Blocking facade** — [`sync::BlockingShell`] and
//!   [`sync::BlockingTransfer`] for synchronous scripts.
//!
//! # Example
//!
//! ```ignore
//! use cluster_expect::{DuoLogin, RemoteShell, ShellConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cluster_expect::Error> {
//!     let config = ShellConfig::from_toml_file("cluster.toml")?;
//!     let flow = DuoLogin::from_toml_file("login.toml")?;
//!
//!     let mut shell = RemoteShell::connect(config, &password).await?;
//!     let report = shell.login(&flow).await?;
//!     assert!(report.success);
//!
//!     shell.send_line("squeue --me").await?;
//!     let outcome = shell.expect("$ ").await?;
//!     println!("{}", outcome.last_chunk);
//!
//!     shell.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod expect;
pub mod jobs;
pub mod login;
pub mod secret;
pub mod shell;
pub mod ssh;
pub mod sync;
pub mod transfer;

pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, DEFAULT_RECV_BUFFER, DEFAULT_RECV_TIMEOUT,
    DEFAULT_SETTLE, HostKeyPolicy, LineEnding, ShellConfig, TransferConfig, Verbosity,
};
pub use encoding::{DecodedChunk, decode_utf8_lossy, strip_ansi};
pub use error::{Error, RemoteFsErrorKind, Result};
pub use expect::{ExpectOptions, ExpectOutcome, Prompt};
pub use jobs::{JobRequest, JobState, JobStatus, JobSubmitter};
pub use login::{DuoLogin, LoginDialog, LoginReport, LoginStep, SecondFactor, StepOutcome};
pub use secret::{deobfuscate, obfuscate};
pub use shell::ShellSession;
pub use ssh::{RemoteShell, ShellStream, SshConnection};
pub use sync::{BlockingShell, BlockingTransfer, block_on};
pub use transfer::{
    RemoteFs, TransferSession, download_directory, is_remote_path_directory,
    make_remote_directory_recursive, make_remote_directory_safe, upload_directory,
};
