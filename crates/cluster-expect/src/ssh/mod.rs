//! SSH transport binding for the shell and transfer sessions.

pub mod channel;
pub mod connection;
pub mod remote;

pub use channel::ShellStream;
pub use connection::SshConnection;
pub use remote::RemoteShell;
