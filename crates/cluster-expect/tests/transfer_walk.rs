//! Directory-walk algorithms against an in-memory remote filesystem.

mod common;

use common::InMemoryRemote;

use cluster_expect::transfer::{
    DEFAULT_DIR_MODE, download_directory, is_remote_path_directory,
    make_remote_directory_recursive, make_remote_directory_safe, upload_directory,
};

/// Build the `{a.txt: "x", sub/b.txt: "y"}` tree under a tempdir.
fn sample_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "x").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/b.txt"), "y").unwrap();
    dir
}

#[tokio::test]
async fn upload_mirrors_the_tree() {
    let local = sample_tree();
    let mut remote = InMemoryRemote::new();

    upload_directory(&mut remote, local.path(), "/data/run1")
        .await
        .unwrap();

    assert_eq!(remote.file("/data/run1/a.txt"), Some(b"x".as_slice()));
    assert_eq!(remote.file("/data/run1/sub/b.txt"), Some(b"y".as_slice()));
    assert!(remote.has_dir("/data/run1/sub"));
}

#[tokio::test]
async fn upload_creates_directories_before_their_contents() {
    let local = sample_tree();
    let mut remote = InMemoryRemote::new();

    upload_directory(&mut remote, local.path(), "/data/run1")
        .await
        .unwrap();

    let mkdir_idx = remote.event_index("mkdir /data/run1/sub").unwrap();
    let put_idx = remote.event_index("put /data/run1/sub/b.txt").unwrap();
    assert!(mkdir_idx < put_idx, "sub must exist before b.txt lands");
}

#[tokio::test]
async fn upload_then_download_round_trips_byte_for_byte() {
    let local = sample_tree();
    let mut remote = InMemoryRemote::new();

    upload_directory(&mut remote, local.path(), "/data/run1")
        .await
        .unwrap();

    let target = tempfile::tempdir().unwrap();
    let fresh = target.path().join("restored");
    download_directory(&mut remote, "/data/run1", &fresh)
        .await
        .unwrap();

    assert_eq!(std::fs::read(fresh.join("a.txt")).unwrap(), b"x");
    assert_eq!(std::fs::read(fresh.join("sub/b.txt")).unwrap(), b"y");
    // Nothing extra appears.
    assert_eq!(std::fs::read_dir(&fresh).unwrap().count(), 2);
}

#[tokio::test]
async fn download_tolerates_preexisting_local_directories() {
    let mut remote = InMemoryRemote::new();
    remote.add_file("/data/run1/out.log", b"done");

    let target = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(target.path().join("restored")).unwrap();

    download_directory(&mut remote, "/data/run1", &target.path().join("restored"))
        .await
        .unwrap();
    assert_eq!(
        std::fs::read(target.path().join("restored/out.log")).unwrap(),
        b"done"
    );
}

#[tokio::test]
async fn mkdir_recursive_on_existing_path_creates_nothing() {
    let mut remote = InMemoryRemote::new();
    remote.add_dir("/scratch/alice/run1");

    let created = make_remote_directory_recursive(&mut remote, "/scratch/alice/run1")
        .await
        .unwrap();

    assert!(!created);
    assert!(remote.mkdir_calls.is_empty(), "zero mkdir calls expected");
}

#[tokio::test]
async fn mkdir_recursive_creates_exactly_the_missing_leaf() {
    let mut remote = InMemoryRemote::new();
    remote.add_dir("/scratch/alice");

    let created = make_remote_directory_recursive(&mut remote, "/scratch/alice/run1")
        .await
        .unwrap();

    assert!(created);
    assert_eq!(remote.mkdir_calls, vec!["/scratch/alice/run1".to_string()]);
}

#[tokio::test]
async fn mkdir_recursive_builds_the_whole_chain() {
    let mut remote = InMemoryRemote::new();

    let created = make_remote_directory_recursive(&mut remote, "/a/b/c")
        .await
        .unwrap();

    assert!(created);
    assert!(remote.has_dir("/a"));
    assert!(remote.has_dir("/a/b"));
    assert!(remote.has_dir("/a/b/c"));
}

#[tokio::test]
async fn mkdir_recursive_root_and_empty_are_no_ops() {
    let mut remote = InMemoryRemote::new();

    assert!(!make_remote_directory_recursive(&mut remote, "/").await.unwrap());
    assert!(!make_remote_directory_recursive(&mut remote, "").await.unwrap());
    assert!(remote.mkdir_calls.is_empty());
}

#[tokio::test]
async fn mkdir_safe_honors_ignore_existing() {
    let mut remote = InMemoryRemote::new();
    remote.add_dir("/scratch/run1");

    make_remote_directory_safe(&mut remote, "/scratch/run1", DEFAULT_DIR_MODE, true)
        .await
        .unwrap();

    let err = make_remote_directory_safe(&mut remote, "/scratch/run1", DEFAULT_DIR_MODE, false)
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn nonexistent_path_is_not_a_directory() {
    let mut remote = InMemoryRemote::new();
    assert!(!is_remote_path_directory(&mut remote, "/no/such/path").await);
}

#[tokio::test]
async fn symlinks_are_skipped_consistently() {
    let local = sample_tree();
    #[cfg(unix)]
    std::os::unix::fs::symlink(local.path().join("a.txt"), local.path().join("a.link")).unwrap();

    let mut remote = InMemoryRemote::new();
    upload_directory(&mut remote, local.path(), "/data/run1")
        .await
        .unwrap();

    assert!(remote.file("/data/run1/a.link").is_none());
    assert_eq!(remote.file("/data/run1/a.txt"), Some(b"x".as_slice()));
}
