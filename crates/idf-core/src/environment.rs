use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fs::{read_toml_config_sync, write_toml_config_sync};

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot store environment variable {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A key/value write to some environment scope.
pub trait EnvironmentStore: Send + Sync {
    /// Sets `key` to `value`. Writing the same key again replaces the previous value.
    fn set_variable(&self, key: &str, value: &Path) -> Result<(), EnvironmentError>;
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentVariables {
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Variables kept in a TOML file so they outlive the process that set them.
///
/// Clones share one lock, writes through them never lose each other's keys.
#[derive(Debug, Clone)]
pub struct EnvironmentFile {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl EnvironmentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> anyhow::Result<EnvironmentVariables> {
        if self.path.exists() {
            read_toml_config_sync(&self.path)
        } else {
            Ok(EnvironmentVariables::default())
        }
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read()?.env.remove(key))
    }
}

impl EnvironmentStore for EnvironmentFile {
    fn set_variable(&self, key: &str, value: &Path) -> Result<(), EnvironmentError> {
        let store_error = |source| EnvironmentError::Store {
            key: key.to_string(),
            source,
        };

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut variables = self.read().map_err(store_error)?;
        variables
            .env
            .insert(key.to_string(), value.to_string_lossy().to_string());

        write_toml_config_sync(&variables, &self.path).map_err(store_error)
    }
}

/// Sets `key` to the absolute path of `destination/folder` and returns that path.
pub fn configure_path(
    store: &dyn EnvironmentStore,
    key: &str,
    destination: &Path,
    folder: &str,
) -> Result<PathBuf, EnvironmentError> {
    configure_existing(store, key, &destination.join(folder))
}

/// Sets `key` to the absolute form of `path` without touching the filesystem.
pub fn configure_existing(
    store: &dyn EnvironmentStore,
    key: &str,
    path: &Path,
) -> Result<PathBuf, EnvironmentError> {
    let absolute = absolute_path(path)?;
    info!("Setting {key} to: {}", absolute.display());

    store.set_variable(key, &absolute)?;

    Ok(absolute)
}

/// Lexically normalized absolute path. `.` components are dropped and `..` pops a component.
pub fn absolute_path(path: &Path) -> Result<PathBuf, EnvironmentError> {
    let absolute = std::path::absolute(path).map_err(|source| EnvironmentError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                normalized.pop();
            }
            component => normalized.push(component),
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_test() {
        let path = absolute_path(Path::new("/opt/./idf/../esp-idf")).unwrap();
        assert_eq!(path, Path::new("/opt/esp-idf"));

        let relative = absolute_path(Path::new("esp-idf")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("esp-idf"));
    }

    #[test]
    fn environment_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvironmentFile::new(dir.path().join("configs").join("Environment.toml"));

        assert_eq!(file.get("IDF_PATH").unwrap(), None);

        file.set_variable("IDF_PATH", Path::new("/opt/esp-idf-v4.4")).unwrap();
        file.set_variable("OTHER", Path::new("/other")).unwrap();
        file.set_variable("IDF_PATH", Path::new("/opt/esp-idf")).unwrap();

        assert_eq!(file.get("IDF_PATH").unwrap().as_deref(), Some("/opt/esp-idf"));
        assert_eq!(file.get("OTHER").unwrap().as_deref(), Some("/other"));
        assert_eq!(file.read().unwrap().env.len(), 2);
    }

    #[test]
    fn environment_file_concurrent_writes_test() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvironmentFile::new(dir.path().join("Environment.toml"));

        std::thread::scope(|scope| {
            for i in 0..8 {
                let file = file.clone();
                scope.spawn(move || {
                    file.set_variable(&format!("KEY_{i}"), Path::new(&format!("/opt/{i}")))
                        .unwrap();
                });
            }
        });

        let variables = file.read().unwrap().env;
        assert_eq!(variables.len(), 8);
        assert_eq!(variables.get("KEY_3").map(String::as_str), Some("/opt/3"));
    }

    #[test]
    fn configure_path_test() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvironmentFile::new(dir.path().join("Environment.toml"));

        let path = configure_path(&file, "IDF_PATH", Path::new("/opt/idf"), "esp-idf-v4.4").unwrap();
        assert_eq!(path, Path::new("/opt/idf/esp-idf-v4.4"));
        assert_eq!(
            file.get("IDF_PATH").unwrap().as_deref(),
            Some("/opt/idf/esp-idf-v4.4")
        );
    }
}
