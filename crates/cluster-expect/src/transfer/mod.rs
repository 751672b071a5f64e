//! Recursive directory mirroring between local and remote filesystems.

pub mod remote;
pub mod sftp;

pub use remote::{
    DEFAULT_DIR_MODE, RemoteFs, download_directory, is_remote_path_directory, join_remote,
    make_remote_directory_recursive, make_remote_directory_safe, upload_directory,
};
pub use sftp::TransferSession;
