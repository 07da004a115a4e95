use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    downloads::{ArchiveFetcher, FetchOutcome},
    environment::{configure_existing, configure_path, EnvironmentStore},
    error::AcquisitionError,
    extract::{extract, remove_archive, strip_archive_extension},
    progress::{ProgressEvent, ProgressSender},
    repository::{CloneConfig, RepositoryCloner},
    version::{AcquisitionMode, VersionDescriptor},
};

use super::{notify::INSTALL_TOOLS_QUESTION, AcquisitionOutcome};

/// A unit of background work.
#[async_trait::async_trait]
pub trait Task: Send + 'static {
    /// Human readable name shown while the task runs.
    fn title(&self) -> String;

    fn mode(&self) -> AcquisitionMode;

    async fn run(
        self: Box<Self>,
        cancel: CancellationToken,
        progress: &dyn ProgressSender<ProgressEvent>,
    ) -> Result<AcquisitionOutcome, AcquisitionError>;
}

/// Where the installation path ends up.
#[derive(Clone)]
pub struct EnvironmentTarget {
    pub store: Arc<dyn EnvironmentStore>,
    pub key: String,
}

async fn create_destination(destination: &Path) -> Result<(), AcquisitionError> {
    tokio::fs::create_dir_all(destination)
        .await
        .map_err(|source| AcquisitionError::Destination {
            path: destination.to_path_buf(),
            source,
        })
}

/// Download → extract → remove archive → configure.
pub struct ArchiveTask {
    pub fetcher: ArchiveFetcher,
    pub version: VersionDescriptor,
    pub destination: PathBuf,
    pub environment: EnvironmentTarget,
}

#[async_trait::async_trait]
impl Task for ArchiveTask {
    fn title(&self) -> String {
        format!("Downloading ESP-IDF {}...", self.version.name())
    }

    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Archive
    }

    async fn run(
        self: Box<Self>,
        cancel: CancellationToken,
        progress: &dyn ProgressSender<ProgressEvent>,
    ) -> Result<AcquisitionOutcome, AcquisitionError> {
        create_destination(&self.destination).await?;

        let archive = match self
            .fetcher
            .fetch(self.version.url(), &self.destination, progress, &cancel)
            .await?
        {
            FetchOutcome::Saved(archive) => archive,
            FetchOutcome::NothingToDownload { status } => {
                return Ok(AcquisitionOutcome::NothingToDownload { status })
            }
            FetchOutcome::Canceled { partial } => {
                if let Some(partial) = partial {
                    info!("Download cancelled, {} is left in place", partial.display());
                }
                return Ok(AcquisitionOutcome::Canceled);
            }
        };

        if cancel.is_cancelled() {
            info!("Cancelled before extraction, {} is left in place", archive.display());
            return Ok(AcquisitionOutcome::Canceled);
        }

        extract(&archive, &self.destination).await?;
        remove_archive(&archive).await;

        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = match strip_archive_extension(&file_name) {
            "" => self.version.name(),
            folder => folder,
        };

        let resolved_path = configure_path(
            &*self.environment.store,
            &self.environment.key,
            &self.destination,
            folder,
        )?;

        Ok(AcquisitionOutcome::Success {
            resolved_path,
            message: format!("{folder} download completed! {INSTALL_TOOLS_QUESTION}"),
        })
    }
}

/// Clone → configure.
pub struct CloneTask {
    pub cloner: Arc<dyn RepositoryCloner>,
    pub config: CloneConfig,
    pub version: VersionDescriptor,
    pub destination: PathBuf,
    pub environment: EnvironmentTarget,
}

#[async_trait::async_trait]
impl Task for CloneTask {
    fn title(&self) -> String {
        format!("Cloning ESP-IDF {}...", self.version.name())
    }

    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Clone
    }

    async fn run(
        self: Box<Self>,
        cancel: CancellationToken,
        progress: &dyn ProgressSender<ProgressEvent>,
    ) -> Result<AcquisitionOutcome, AcquisitionError> {
        create_destination(&self.destination).await?;

        if cancel.is_cancelled() {
            return Ok(AcquisitionOutcome::Canceled);
        }

        progress
            .update(ProgressEvent::Begin {
                task: self.title(),
                total: None,
            })
            .await;

        self.cloner.clone_repository(&self.config).await?;

        let resolved_path = configure_existing(
            &*self.environment.store,
            &self.environment.key,
            &self.config.directory,
        )?;

        Ok(AcquisitionOutcome::Success {
            resolved_path,
            message: format!(
                "ESP-IDF {} cloning completed! {INSTALL_TOOLS_QUESTION}",
                self.version.name()
            ),
        })
    }
}
