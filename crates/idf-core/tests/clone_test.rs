//! Clones from a local repository with the real `git` executable.

use std::{path::Path, process::Command};

use idf_core::repository::{CloneConfig, GitCli, RepositoryCloner};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=idf", "-c", "user.email=idf@example.com"])
        .args(["-c", "init.defaultBranch=master", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {args:?} failed");
}

/// Repository with `README.md` on `master` and `version.txt` only on `release/v5.1`.
fn repository() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path();

    git(path, &["init", "--quiet"]);
    std::fs::write(path.join("README.md"), "ESP-IDF").unwrap();
    git(path, &["add", "README.md"]);
    git(path, &["commit", "--quiet", "-m", "Initial commit"]);

    git(path, &["checkout", "--quiet", "-b", "release/v5.1"]);
    std::fs::write(path.join("version.txt"), "v5.1").unwrap();
    git(path, &["add", "version.txt"]);
    git(path, &["commit", "--quiet", "-m", "v5.1"]);
    git(path, &["checkout", "--quiet", "master"]);

    dir
}

#[tokio::test]
async fn branch_is_checked_out_into_esp_idf() {
    let upstream = repository();
    let destination = tempfile::tempdir().unwrap();
    let uri = upstream.path().to_string_lossy().to_string();

    let config = CloneConfig::new(&uri, "release/v5.1", destination.path());
    GitCli::default().clone_repository(&config).await.unwrap();

    let checkout = destination.path().join("esp-idf");
    assert_eq!(config.directory, checkout);
    assert_eq!(std::fs::read_to_string(checkout.join("version.txt")).unwrap(), "v5.1");
    assert!(checkout.join(".git").exists());
}

#[tokio::test]
async fn missing_branch_reports_git_error() {
    let upstream = repository();
    let destination = tempfile::tempdir().unwrap();
    let uri = upstream.path().to_string_lossy().to_string();

    let config = CloneConfig::new(&uri, "v0.0-missing", destination.path());
    let err = GitCli::default().clone_repository(&config).await.unwrap_err();

    // Only the last line of git's stderr is kept.
    assert!(!err.message().contains('\n'));
    assert!(err.message().contains("v0.0-missing"), "{}", err.message());
}
