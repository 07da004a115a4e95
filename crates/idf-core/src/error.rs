use crate::{
    downloads::DownloadError, environment::EnvironmentError, extract::ExtractError,
    repository::CloneError,
};

/// Every way an acquisition can fail. Cancellation is not an error.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Clone(#[from] CloneError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("Cannot create {path}: {source}")]
    Destination {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
