//! Remote filesystem seam and the recursive tree-walk algorithms.
//!
//! The walks are generic over [`RemoteFs`] so the algorithms can be
//! exercised against an in-memory filesystem in tests; the SFTP-backed
//! [`TransferSession`](crate::transfer::TransferSession) is the
//! production implementation.
//!
//! Both directory operations are depth-first, sequential, and have no
//! rollback: a transfer that fails partway leaves a partially-populated
//! destination with no marker of what succeeded.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::{Error, Result};

/// Default mode for created remote directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// The primitive operations the walks need from a remote filesystem.
///
/// Contract notes:
/// - `make_dir` MUST report [`RemoteFsErrorKind::AlreadyExists`]
///   (via [`Error::is_already_exists`]) when the path already exists as
///   a directory — the idempotent-mkdir policy keys off that kind.
/// - `enter_dir` is the change-directory analog: it succeeds exactly
///   when the path exists and is a directory.
///
/// [`RemoteFsErrorKind::AlreadyExists`]: crate::error::RemoteFsErrorKind::AlreadyExists
pub trait RemoteFs {
    /// Copy one local file to a remote path.
    fn put_file(&mut self, local: &Path, remote: &str) -> impl Future<Output = Result<()>>;

    /// Copy one remote file to a local path.
    fn get_file(&mut self, remote: &str, local: &Path) -> impl Future<Output = Result<()>>;

    /// Create one remote directory (parent must exist).
    fn make_dir(&mut self, path: &str, mode: u32) -> impl Future<Output = Result<()>>;

    /// Probe that `path` exists and is a directory.
    fn enter_dir(&mut self, path: &str) -> impl Future<Output = Result<()>>;

    /// Names of the entries directly under `path` (no `.`/`..`).
    fn list_dir(&mut self, path: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// Whether `path` stats as a directory. A stat failure (nonexistent
    /// path) is `false`, never an error.
    fn is_dir(&mut self, path: &str) -> impl Future<Output = bool>;

    /// Resolve `path` to canonical absolute form.
    fn canonicalize(&mut self, path: &str) -> impl Future<Output = Result<String>>;
}

/// Join a remote directory and an entry name.
///
/// Remote paths are `/`-separated strings; this stays consistent
/// regardless of trailing separators on `base`.
#[must_use]
pub fn join_remote(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

/// The parent of a remote path: `""` for a bare name (cwd, guaranteed to
/// exist), `"/"` for a top-level entry.
#[must_use]
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        None => "",
        Some(0) => "/",
        Some(idx) => &path[..idx],
    }
}

/// Whether a remote path is a directory; nonexistent is `false`.
pub async fn is_remote_path_directory<R: RemoteFs>(fs: &mut R, path: &str) -> bool {
    fs.is_dir(path).await
}

/// Create one remote directory, optionally tolerating its existence.
///
/// With `ignore_existing`, an "already exists" failure is swallowed by
/// explicit policy; every other failure propagates.
pub async fn make_remote_directory_safe<R: RemoteFs>(
    fs: &mut R,
    path: &str,
    mode: u32,
    ignore_existing: bool,
) -> Result<()> {
    match fs.make_dir(path, mode).await {
        Ok(()) => Ok(()),
        Err(e) if ignore_existing && e.is_already_exists() => {
            tracing::trace!(path, "remote directory already exists");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Ensure every component of `path` exists, `mkdir -p` style.
///
/// Walks upward through parents using only the two primitives the
/// protocol offers — enter a directory, make one directory — rather than
/// a pre-split component list: probe the path; on failure, recurse on
/// the parent, then create and enter this component. Base cases: `/` is
/// entered directly and never created; an empty relative path is a no-op
/// (its parent is already guaranteed to exist).
///
/// Returns whether any directory was newly created.
pub async fn make_remote_directory_recursive<R: RemoteFs>(fs: &mut R, path: &str) -> Result<bool> {
    mkdir_walk(fs, path).await
}

fn mkdir_walk<'a, R: RemoteFs>(
    fs: &'a mut R,
    path: &'a str,
) -> Pin<Box<dyn Future<Output = Result<bool>> + 'a>> {
    Box::pin(async move {
        if path.is_empty() {
            return Ok(false);
        }
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            // All slashes: the root.
            fs.enter_dir("/").await?;
            return Ok(false);
        }

        match fs.enter_dir(path).await {
            Ok(()) => Ok(false),
            Err(_) => {
                let parent = parent_of(path).to_string();
                mkdir_walk(fs, &parent).await?;
                fs.make_dir(path, DEFAULT_DIR_MODE).await?;
                fs.enter_dir(path).await?;
                tracing::debug!(path, "created remote directory");
                Ok(true)
            }
        }
    })
}

/// Recursively mirror a local directory tree to the remote.
///
/// The remote root is created if missing, then both roots are resolved
/// to canonical absolute form before walking. Sibling order is
/// directory-listing order. Symlinks and special files are skipped with
/// a warning.
pub async fn upload_directory<R: RemoteFs>(
    fs: &mut R,
    local_dir: &Path,
    remote_dir: &str,
) -> Result<()> {
    let local_root = tokio::fs::canonicalize(local_dir).await.map_err(|e| {
        Error::io_context(format!("resolving local directory {}", local_dir.display()), e)
    })?;
    make_remote_directory_recursive(fs, remote_dir).await?;
    let remote_root = fs.canonicalize(remote_dir).await?;

    tracing::info!(
        local = %local_root.display(),
        remote = %remote_root,
        "uploading directory tree"
    );
    upload_walk(fs, &local_root, &remote_root).await
}

fn upload_walk<'a, R: RemoteFs>(
    fs: &'a mut R,
    local_dir: &'a Path,
    remote_dir: &'a str,
) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(local_dir).await.map_err(|e| {
            Error::io_context(format!("listing local directory {}", local_dir.display()), e)
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_context("reading local directory entry", e))?
        {
            let local_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let remote_path = join_remote(remote_dir, &name);
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::io_context("reading local entry type", e))?;

            if file_type.is_symlink() {
                tracing::warn!(path = %local_path.display(), "skipping symlink during upload");
            } else if file_type.is_dir() {
                make_remote_directory_safe(fs, &remote_path, DEFAULT_DIR_MODE, true).await?;
                upload_walk(fs, &local_path, &remote_path).await?;
            } else if file_type.is_file() {
                tracing::debug!(local = %local_path.display(), remote = %remote_path, "uploading file");
                fs.put_file(&local_path, &remote_path).await?;
            } else {
                tracing::warn!(path = %local_path.display(), "skipping special file during upload");
            }
        }

        Ok(())
    })
}

/// Recursively mirror a remote directory tree to the local filesystem.
///
/// The local root is created idempotently, both roots are canonicalized,
/// then the remote listing is walked. Entry type is decided by a
/// dedicated per-entry stat, since the listing does not expose it.
pub async fn download_directory<R: RemoteFs>(
    fs: &mut R,
    remote_dir: &str,
    local_dir: &Path,
) -> Result<()> {
    tokio::fs::create_dir_all(local_dir).await.map_err(|e| {
        Error::io_context(format!("creating local directory {}", local_dir.display()), e)
    })?;
    let local_root = tokio::fs::canonicalize(local_dir).await.map_err(|e| {
        Error::io_context(format!("resolving local directory {}", local_dir.display()), e)
    })?;
    let remote_root = fs.canonicalize(remote_dir).await?;

    tracing::info!(
        remote = %remote_root,
        local = %local_root.display(),
        "downloading directory tree"
    );
    download_walk(fs, &remote_root, &local_root).await
}

fn download_walk<'a, R: RemoteFs>(
    fs: &'a mut R,
    remote_dir: &'a str,
    local_dir: &'a Path,
) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        let names = fs.list_dir(remote_dir).await?;

        for name in names {
            if name == "." || name == ".." {
                continue;
            }
            let remote_path = join_remote(remote_dir, &name);
            let local_path = local_dir.join(&name);

            if fs.is_dir(&remote_path).await {
                tokio::fs::create_dir_all(&local_path).await.map_err(|e| {
                    Error::io_context(
                        format!("creating local directory {}", local_path.display()),
                        e,
                    )
                })?;
                download_walk(fs, &remote_path, &local_path).await?;
            } else {
                tracing::debug!(remote = %remote_path, local = %local_path.display(), "downloading file");
                fs.get_file(&remote_path, &local_path).await?;
            }
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_remote_handles_separators() {
        assert_eq!(join_remote("/scratch/run1", "a.txt"), "/scratch/run1/a.txt");
        assert_eq!(join_remote("/scratch/run1/", "a.txt"), "/scratch/run1/a.txt");
        assert_eq!(join_remote("/", "a.txt"), "/a.txt");
    }

    #[test]
    fn parent_of_walks_upward() {
        assert_eq!(parent_of("/scratch/run1"), "/scratch");
        assert_eq!(parent_of("/scratch"), "/");
        assert_eq!(parent_of("run1"), "");
        assert_eq!(parent_of("scratch/run1"), "scratch");
    }
}
