use std::path::{Path, PathBuf};

use futures_util::stream::StreamExt;
use reqwest::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    Client, StatusCode,
};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    progress::{ProgressEvent, ProgressSender, ProgressState, TOTAL_WORK},
    DOWNLOAD_BUFFER_SIZE,
};

pub mod file_name;

pub use file_name::{file_name_from_disposition, file_name_from_url};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Cannot download {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The whole body was written to the path.
    Saved(PathBuf),
    /// The server did not answer with a success status. Nothing was written.
    NothingToDownload { status: StatusCode },
    /// Cancelled by the consumer. The partially written file, if any, is left in place.
    Canceled { partial: Option<PathBuf> },
}

/// Streams an HTTP resource into a directory.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: Client,
    buffer_size: usize,
}

impl Default for ArchiveFetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl ArchiveFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            buffer_size: DOWNLOAD_BUFFER_SIZE,
        }
    }

    /// Size of the chunks written to disk. Progress and cancellation are checked once per chunk.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[tracing::instrument(skip(self, destination, sender, cancel))]
    pub async fn fetch(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
        sender: &dyn ProgressSender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, DownloadError> {
        let destination = destination.as_ref();
        let task = format!("Downloading {url}...");
        info!("{task}");

        let transport = |source| DownloadError::Transport {
            url: url.to_string(),
            source,
        };

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("File download cancelled before the server answered");
                return Ok(FetchOutcome::Canceled { partial: None });
            }
            response = self.client.get(url).send() => response.map_err(transport)?,
        };

        let status = response.status();
        if !status.is_success() {
            info!("No file to download. Server replied HTTP code: {status}");
            return Ok(FetchOutcome::NothingToDownload { status });
        }

        let headers = response.headers();
        let disposition = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let content_length = response.content_length();

        let file_name = disposition
            .as_deref()
            .and_then(file_name_from_disposition)
            .unwrap_or_else(|| file_name_from_url(url));

        debug!("Content-Type = {content_type}");
        debug!("Content-Disposition = {disposition:?}");
        debug!("Content-Length = {content_length:?}");
        debug!("fileName = {file_name}");

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(DownloadError::io(destination))?;

        let path = destination.join(&file_name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(DownloadError::io(&path))?;

        let mut state = ProgressState::new(content_length);
        sender
            .update(ProgressEvent::Begin {
                task: task.clone(),
                total: (!state.is_indeterminate()).then_some(TOTAL_WORK),
            })
            .await;

        let mut stream = response.bytes_stream();
        let mut reported_mb = 0;
        let mut canceled = false;

        'stream: loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    canceled = true;
                    break 'stream;
                }
                item = stream.next() => item,
            };

            let Some(item) = item else {
                break;
            };

            let bytes = item.map_err(|err| {
                error!("Error occurred during file downloading\nError: {}", err);
                transport(err)
            })?;

            for chunk in bytes.chunks(self.buffer_size) {
                file.write_all(chunk).await.map_err(|err| {
                    error!("Error occurred during writing to file\nError: {}", err);
                    DownloadError::Io {
                        path: path.clone(),
                        source: err,
                    }
                })?;

                if let Some(worked) = state.advance(chunk.len()) {
                    sender
                        .update(ProgressEvent::Worked {
                            worked,
                            label: format!("{task}({})", state.label()),
                        })
                        .await;
                } else if state.is_indeterminate() && state.downloaded_bytes() >> 20 > reported_mb {
                    reported_mb = state.downloaded_bytes() >> 20;
                    sender
                        .update(ProgressEvent::Label(format!("{task}({})", state.label())))
                        .await;
                }

                if cancel.is_cancelled() {
                    canceled = true;
                    break 'stream;
                }
            }
        }

        // Dropping the stream releases the connection.
        drop(stream);
        file.flush().await.map_err(DownloadError::io(&path))?;
        drop(file);

        if canceled {
            info!(
                "File download cancelled after {} bytes",
                state.downloaded_bytes()
            );
            return Ok(FetchOutcome::Canceled {
                partial: Some(path),
            });
        }

        debug!("Downloaded successfully {}", path.to_string_lossy());

        Ok(FetchOutcome::Saved(path))
    }
}
