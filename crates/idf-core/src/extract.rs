use std::{
    fs::File,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Cannot extract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot extract {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Extraction task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    const EXTENSIONS: [(&'static str, ArchiveFormat); 4] = [
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".tar", ArchiveFormat::Tar),
        (".zip", ArchiveFormat::Zip),
    ];

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::split(file_name).map(|(_, format)| format)
    }

    fn split(file_name: &str) -> Option<(&str, Self)> {
        let lowercase = file_name.to_ascii_lowercase();
        Self::EXTENSIONS.iter().find_map(|(extension, format)| {
            lowercase
                .ends_with(extension)
                .then(|| (&file_name[..file_name.len() - extension.len()], *format))
        })
    }
}

/// Installation folder name of an archive: the file name without its archive extension.
///
/// `esp-idf-v4.4.zip` becomes `esp-idf-v4.4`. Names without a known extension are returned unchanged.
pub fn strip_archive_extension(file_name: &str) -> &str {
    ArchiveFormat::split(file_name).map_or(file_name, |(stem, _)| stem)
}

/// Unpacks `archive` into `destination`, keeping relative paths.
///
/// Runs on the blocking thread pool.
#[tracing::instrument(skip_all, fields(archive = %archive.as_ref().display()))]
pub async fn extract(
    archive: impl AsRef<Path>,
    destination: impl AsRef<Path>,
) -> Result<(), ExtractError> {
    let archive = archive.as_ref().to_path_buf();
    let destination = destination.as_ref().to_path_buf();

    tokio::task::spawn_blocking(move || extract_sync(&archive, &destination)).await?
}

pub fn extract_sync(archive: &Path, destination: &Path) -> Result<(), ExtractError> {
    let format = archive
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(ArchiveFormat::from_file_name)
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive.to_path_buf()))?;

    let io_error = |source| ExtractError::Io {
        path: archive.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(destination).map_err(io_error)?;
    let file = File::open(archive).map_err(io_error)?;

    info!(
        "Extracting {} into {}",
        archive.display(),
        destination.display()
    );

    match format {
        ArchiveFormat::Zip => {
            let zip_error = |source| ExtractError::Zip {
                path: archive.to_path_buf(),
                source,
            };
            let mut zip = zip::ZipArchive::new(file).map_err(zip_error)?;
            zip.extract(destination).map_err(zip_error)
        }
        ArchiveFormat::TarGz => {
            let tar = flate2::read::GzDecoder::new(file);
            tar::Archive::new(tar).unpack(destination).map_err(io_error)
        }
        ArchiveFormat::Tar => tar::Archive::new(file).unpack(destination).map_err(io_error),
    }
}

/// Removes a downloaded archive. Failures are only logged.
pub async fn remove_archive(archive: impl AsRef<Path>) {
    let archive = archive.as_ref();
    if let Err(err) = tokio::fs::remove_file(archive).await {
        warn!("Cannot remove {}: {err}", archive.display());
    }
}
