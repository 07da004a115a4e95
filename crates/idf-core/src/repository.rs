use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;
use tracing::{debug, info};

use crate::ESP_IDF_CHECKOUT_DIR;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CloneError {
    message: String,
}

impl CloneError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything a single clone needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneConfig {
    pub uri: String,
    pub branch: String,
    pub directory: PathBuf,
    pub recurse_submodules: bool,
    pub depth: Option<u32>,
}

impl CloneConfig {
    /// Checks out `branch` of `uri` into `destination/esp-idf`.
    pub fn new(uri: impl Into<String>, branch: impl Into<String>, destination: impl AsRef<Path>) -> Self {
        Self {
            uri: uri.into(),
            branch: branch.into(),
            directory: destination.as_ref().join(ESP_IDF_CHECKOUT_DIR),
            recurse_submodules: true,
            depth: None,
        }
    }

    #[must_use]
    pub fn recurse_submodules(mut self, recurse_submodules: bool) -> Self {
        self.recurse_submodules = recurse_submodules;
        self
    }

    #[must_use]
    pub fn depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    /// Arguments of the `git` invocation performing this clone.
    pub fn git_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["clone".into(), "--branch".into(), self.branch.clone().into()];

        if let Some(depth) = self.depth {
            args.push("--depth".into());
            args.push(depth.to_string().into());
        }

        if self.recurse_submodules {
            args.push("--recurse-submodules".into());
            if self.depth.is_some() {
                args.push("--shallow-submodules".into());
            }
        }

        args.push("--".into());
        args.push(self.uri.clone().into());
        args.push(self.directory.clone().into_os_string());

        args
    }
}

#[async_trait::async_trait]
pub trait RepositoryCloner: Send + Sync {
    async fn clone_repository(&self, config: &CloneConfig) -> Result<(), CloneError>;
}

/// Clones with the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl RepositoryCloner for GitCli {
    #[tracing::instrument(skip(self), fields(uri = %config.uri, branch = %config.branch))]
    async fn clone_repository(&self, config: &CloneConfig) -> Result<(), CloneError> {
        info!("Cloning into {}", config.directory.display());

        let args = config.git_args();
        debug!("Running {} {args:?}", self.program.display());

        let output = Command::new(&self.program)
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| CloneError::new(format!("Cannot run {}: {err}", self.program.display())))?;

        if output.status.success() {
            info!("Repository cloned into {}", config.directory.display());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map_or_else(
                || format!("git clone failed with {}", output.status),
                |line| line.trim().to_string(),
            );

        Err(CloneError::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_dir_test() {
        for branch in ["master", "release/v5.1", "v4.4"] {
            let config = CloneConfig::new(crate::ESP_IDF_REPOSITORY, branch, "/opt/idf");
            assert_eq!(config.directory, Path::new("/opt/idf").join("esp-idf"));
        }
    }

    #[test]
    fn git_args_test() {
        let config = CloneConfig::new("https://example.com/esp-idf.git", "master", "/opt/idf");
        let args = config.git_args();
        let checkout = Path::new("/opt/idf").join("esp-idf");

        assert_eq!(
            args,
            vec![
                OsString::from("clone"),
                OsString::from("--branch"),
                OsString::from("master"),
                OsString::from("--recurse-submodules"),
                OsString::from("--"),
                OsString::from("https://example.com/esp-idf.git"),
                checkout.into_os_string(),
            ]
        );

        let config = config.recurse_submodules(false).depth(Some(1));
        let args = config.git_args();
        assert!(args.contains(&OsString::from("--depth")));
        assert!(!args.contains(&OsString::from("--recurse-submodules")));
    }

    #[tokio::test]
    async fn missing_program_test() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = GitCli::new(dir.path().join("no-such-git"));
        let config = CloneConfig::new("https://example.com/esp-idf.git", "master", dir.path());

        let err = cloner.clone_repository(&config).await.unwrap_err();
        assert!(err.message().starts_with("Cannot run"));
    }
}
