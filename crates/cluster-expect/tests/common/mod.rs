//! Shared test helpers.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use cluster_expect::{Error, RemoteFs, RemoteFsErrorKind, Result, ShellConfig, Verbosity};

/// A quiet shell configuration for driving sessions over duplex streams.
pub fn shell_config() -> ShellConfig {
    ShellConfig::new("test-host", "alice").verbosity(Verbosity::Silent)
}

/// An in-memory remote filesystem for exercising the transfer walks.
///
/// Tracks every `make_dir` attempt and an ordered event log so tests can
/// assert call counts and ordering.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    /// Every `make_dir` attempt, successful or not.
    pub mkdir_calls: Vec<String>,
    /// Ordered log of mutations: `mkdir <path>` and `put <path>`.
    pub events: Vec<String>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        let mut remote = Self::default();
        remote.dirs.insert("/".to_string());
        remote
    }

    fn normalize(path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }

    fn parent(path: &str) -> String {
        match path.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => path[..idx].to_string(),
            None => "/".to_string(),
        }
    }

    /// Test setup: create a directory and all its parents.
    pub fn add_dir(&mut self, path: &str) {
        let mut current = Self::normalize(path);
        while current != "/" {
            self.dirs.insert(current.clone());
            current = Self::parent(&current);
        }
    }

    /// Test setup: create a file (parents included) without logging.
    pub fn add_file(&mut self, path: &str, contents: &[u8]) {
        let path = Self::normalize(path);
        self.add_dir(&Self::parent(&path));
        self.files.insert(path, contents.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(&Self::normalize(path)).map(Vec::as_slice)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.contains(&Self::normalize(path))
    }

    /// Index of an event in the mutation log.
    pub fn event_index(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

impl RemoteFs for InMemoryRemote {
    async fn put_file(&mut self, local: &Path, remote: &str) -> Result<()> {
        let remote = Self::normalize(remote);
        if !self.dirs.contains(&Self::parent(&remote)) {
            return Err(Error::remote_fs(
                remote,
                RemoteFsErrorKind::NotFound,
                "parent directory missing",
            ));
        }
        let data = tokio::fs::read(local).await?;
        self.events.push(format!("put {remote}"));
        self.files.insert(remote, data);
        Ok(())
    }

    async fn get_file(&mut self, remote: &str, local: &Path) -> Result<()> {
        let remote = Self::normalize(remote);
        let data = self
            .files
            .get(&remote)
            .ok_or_else(|| {
                Error::remote_fs(remote.as_str(), RemoteFsErrorKind::NotFound, "no such file")
            })?
            .clone();
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, data).await?;
        Ok(())
    }

    async fn make_dir(&mut self, path: &str, _mode: u32) -> Result<()> {
        let path = Self::normalize(path);
        self.mkdir_calls.push(path.clone());
        if self.dirs.contains(&path) {
            return Err(Error::already_exists(path));
        }
        if !self.dirs.contains(&Self::parent(&path)) {
            return Err(Error::remote_fs(
                path,
                RemoteFsErrorKind::NotFound,
                "parent directory missing",
            ));
        }
        self.events.push(format!("mkdir {path}"));
        self.dirs.insert(path);
        Ok(())
    }

    async fn enter_dir(&mut self, path: &str) -> Result<()> {
        let path = Self::normalize(path);
        if self.dirs.contains(&path) {
            Ok(())
        } else {
            Err(Error::remote_fs(
                path,
                RemoteFsErrorKind::NotFound,
                "no such directory",
            ))
        }
    }

    async fn list_dir(&mut self, path: &str) -> Result<Vec<String>> {
        let path = Self::normalize(path);
        if !self.dirs.contains(&path) {
            return Err(Error::remote_fs(
                path,
                RemoteFsErrorKind::NotFound,
                "no such directory",
            ));
        }
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        let mut names: Vec<String> = self
            .dirs
            .iter()
            .chain(self.files.keys())
            .filter_map(|p| {
                let rest = p.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn is_dir(&mut self, path: &str) -> bool {
        self.dirs.contains(&Self::normalize(path))
    }

    async fn canonicalize(&mut self, path: &str) -> Result<String> {
        Ok(Self::normalize(path))
    }
}
