use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    fs::read_toml_config, DOT_IDF_ENVIRONMENT_CONFIG, DOWNLOAD_BUFFER_SIZE, ESP_IDF_REPOSITORY,
    IDF_PATH, IDF_RELEASE_URL, IDF_VERSIONS_URL, INSTALL_TOOLS_COMMAND,
};

/// `Settings` are the global settings of the installer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Variable that receives the installation path.
    pub env_key: String,
    /// Repository cloned for `master`.
    pub repository: String,
    pub versions_url: String,
    /// Archive location of a release, `{version}` is replaced by the version name.
    pub release_url: String,
    pub buffer_size: usize,
    pub recurse_submodules: bool,
    pub clone_depth: Option<u32>,
    pub install_tools_command: String,
    pub environment_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env_key: IDF_PATH.into(),
            repository: ESP_IDF_REPOSITORY.into(),
            versions_url: IDF_VERSIONS_URL.into(),
            release_url: IDF_RELEASE_URL.into(),
            buffer_size: DOWNLOAD_BUFFER_SIZE,
            recurse_submodules: true,
            clone_depth: None,
            install_tools_command: INSTALL_TOOLS_COMMAND.into(),
            environment_file: DOT_IDF_ENVIRONMENT_CONFIG.into(),
        }
    }
}

impl Settings {
    /// Reads the settings, falling back to the defaults when the file does not exist.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            read_toml_config(path).await
        } else {
            tracing::debug!("{} does not exist, using default settings", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::write_toml_config;

    use super::*;

    #[tokio::test]
    async fn missing_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("Settings.toml")).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn partial_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Settings.toml");
        tokio::fs::write(&path, "env_key = \"MY_IDF\"\nbuffer_size = 8192\n")
            .await
            .unwrap();

        let settings = Settings::load(&path).await.unwrap();
        assert_eq!(settings.env_key, "MY_IDF");
        assert_eq!(settings.buffer_size, 8192);
        assert_eq!(settings.repository, ESP_IDF_REPOSITORY);
    }

    #[tokio::test]
    async fn write_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Settings.toml");
        let mock = Settings {
            clone_depth: Some(1),
            ..Default::default()
        };

        write_toml_config(&mock, &path).await.unwrap();
        assert_eq!(Settings::load(&path).await.unwrap(), mock);
    }
}
