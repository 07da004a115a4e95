use std::{fmt::Display, path::PathBuf};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::MASTER_VERSION;

/// A selectable ESP-IDF version and the location it is acquired from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    name: String,
    url: String,
}

impl VersionDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `master` is acquired by cloning the repository, everything else is a release archive.
    pub fn is_master(&self) -> bool {
        self.name == MASTER_VERSION
    }

    pub fn mode(&self) -> AcquisitionMode {
        if self.is_master() {
            AcquisitionMode::Clone
        } else {
            AcquisitionMode::Archive
        }
    }
}

impl Display for VersionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    Archive,
    Clone,
    ConfigureExisting,
}

impl Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionMode::Archive => write!(f, "archive"),
            AcquisitionMode::Clone => write!(f, "clone"),
            AcquisitionMode::ConfigureExisting => write!(f, "configure existing"),
        }
    }
}

/// What the presentation layer asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionRequest {
    /// Point the environment at an installation that is already on disk.
    Existing { path: PathBuf },
    /// Download or clone `version` into `destination`.
    Acquire {
        version: VersionDescriptor,
        destination: PathBuf,
    },
}

impl AcquisitionRequest {
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self::Existing { path: path.into() }
    }

    pub fn acquire(version: VersionDescriptor, destination: impl Into<PathBuf>) -> Self {
        Self::Acquire {
            version,
            destination: destination.into(),
        }
    }

    /// Builds a request from the wizard-style inputs where `use_existing` decides
    /// which half of the inputs is meaningful.
    pub fn from_inputs(
        version: VersionDescriptor,
        destination: impl Into<PathBuf>,
        use_existing: bool,
        existing_path: Option<PathBuf>,
    ) -> Option<Self> {
        if use_existing {
            existing_path.map(Self::existing)
        } else {
            Some(Self::acquire(version, destination))
        }
    }

    pub fn mode(&self) -> AcquisitionMode {
        match self {
            Self::Existing { .. } => AcquisitionMode::ConfigureExisting,
            Self::Acquire { version, .. } => version.mode(),
        }
    }
}

/// Reads the published list of ESP-IDF versions.
#[derive(Debug, Clone)]
pub struct VersionsReader {
    client: Client,
    versions_url: String,
    release_url: String,
    repository: String,
}

impl VersionsReader {
    pub fn new(
        client: Client,
        versions_url: impl Into<String>,
        release_url: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            client,
            versions_url: versions_url.into(),
            release_url: release_url.into(),
            repository: repository.into(),
        }
    }

    /// Descriptor for `name`, without consulting the published list.
    pub fn descriptor(&self, name: &str) -> VersionDescriptor {
        let url = if name == MASTER_VERSION {
            self.repository.clone()
        } else {
            release_url(&self.release_url, name)
        };

        VersionDescriptor::new(name, url)
    }

    #[tracing::instrument(skip(self), fields(url = %self.versions_url))]
    pub async fn versions(&self) -> reqwest::Result<Vec<VersionDescriptor>> {
        let body = self
            .client
            .get(&self.versions_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let versions = parse_versions(&body)
            .map(|name| self.descriptor(name))
            .collect::<Vec<_>>();

        info!("Found {} ESP-IDF versions", versions.len());
        debug!("Versions: {versions:?}");

        Ok(versions)
    }
}

pub fn release_url(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

/// One version per line. Blank lines and `#` comments are skipped.
pub fn parse_versions(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
