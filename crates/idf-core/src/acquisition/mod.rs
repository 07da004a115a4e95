//! Chooses how a version is acquired and drives the steps in the background.

use std::{path::PathBuf, sync::Arc};

use reqwest::{Client, StatusCode};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    configs::Settings,
    downloads::ArchiveFetcher,
    environment::{configure_existing, EnvironmentStore},
    progress::{ProgressEvent, ProgressSender},
    repository::{CloneConfig, GitCli, RepositoryCloner},
    version::{AcquisitionMode, AcquisitionRequest, VersionDescriptor},
    ESP_IDF_REPOSITORY, IDF_PATH,
};

pub mod notify;
pub mod task;

pub use notify::{FollowUp, Notification, Notifier, INSTALL_TOOLS_QUESTION};
pub use task::{ArchiveTask, CloneTask, EnvironmentTarget, Task};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    Success {
        resolved_path: PathBuf,
        /// Question presented to the user after success.
        message: String,
    },
    Failure {
        message: String,
    },
    Canceled,
    /// The server had nothing to download. Ends silently.
    NothingToDownload {
        status: StatusCode,
    },
}

impl AcquisitionOutcome {
    pub fn state(&self) -> AcquisitionState {
        match self {
            Self::Success { .. } => AcquisitionState::Succeeded,
            Self::Failure { .. } => AcquisitionState::Failed,
            Self::Canceled => AcquisitionState::Canceled,
            Self::NothingToDownload { .. } => AcquisitionState::Skipped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Running(AcquisitionMode),
    Succeeded,
    Failed,
    Canceled,
    Skipped,
}

/// Result of [`Orchestrator::acquire`].
#[derive(Debug)]
pub enum Acquisition {
    /// Finished synchronously.
    Completed(AcquisitionOutcome),
    /// Running in the background.
    Scheduled(TaskHandle),
}

impl Acquisition {
    /// Waits for the outcome regardless of how the acquisition ran.
    pub async fn outcome(self) -> AcquisitionOutcome {
        match self {
            Self::Completed(outcome) => outcome,
            Self::Scheduled(handle) => handle.wait().await,
        }
    }
}

/// Handle of a background acquisition.
#[derive(Debug)]
pub struct TaskHandle {
    title: String,
    cancel: CancellationToken,
    state: watch::Receiver<AcquisitionState>,
    join: JoinHandle<AcquisitionOutcome>,
    notifier: Notifier,
}

impl TaskHandle {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Asks the task to stop. Only the download reacts mid-way, clone and
    /// extraction run to completion once started.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> AcquisitionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AcquisitionState> {
        self.state.clone()
    }

    pub async fn wait(self) -> AcquisitionOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("{} did not finish: {err}", self.title);
                let message = err.to_string();
                self.notifier.error(message.clone());
                AcquisitionOutcome::Failure { message }
            }
        }
    }
}

pub struct Orchestrator {
    fetcher: ArchiveFetcher,
    cloner: Arc<dyn RepositoryCloner>,
    environment: EnvironmentTarget,
    notifier: Notifier,
    repository: String,
    recurse_submodules: bool,
    clone_depth: Option<u32>,
}

impl Orchestrator {
    pub fn new(environment: Arc<dyn EnvironmentStore>, notifier: Notifier) -> Self {
        Self {
            fetcher: ArchiveFetcher::default(),
            cloner: Arc::new(GitCli::default()),
            environment: EnvironmentTarget {
                store: environment,
                key: IDF_PATH.into(),
            },
            notifier,
            repository: ESP_IDF_REPOSITORY.into(),
            recurse_submodules: true,
            clone_depth: None,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        client: Client,
        environment: Arc<dyn EnvironmentStore>,
        notifier: Notifier,
    ) -> Self {
        Self::new(environment, notifier)
            .with_fetcher(ArchiveFetcher::new(client).with_buffer_size(settings.buffer_size))
            .with_env_key(settings.env_key.clone())
            .with_repository(settings.repository.clone())
            .with_clone_options(settings.recurse_submodules, settings.clone_depth)
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: ArchiveFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub fn with_cloner(mut self, cloner: Arc<dyn RepositoryCloner>) -> Self {
        self.cloner = cloner;
        self
    }

    #[must_use]
    pub fn with_env_key(mut self, key: impl Into<String>) -> Self {
        self.environment.key = key.into();
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    #[must_use]
    pub fn with_clone_options(mut self, recurse_submodules: bool, depth: Option<u32>) -> Self {
        self.recurse_submodules = recurse_submodules;
        self.clone_depth = depth;
        self
    }

    /// Starts an acquisition.
    ///
    /// Existing installations are configured before this returns. Archive and
    /// clone acquisitions are spawned on the runtime and this returns right away.
    pub fn acquire(
        &self,
        request: AcquisitionRequest,
        progress: Arc<dyn ProgressSender<ProgressEvent>>,
    ) -> Acquisition {
        match request {
            AcquisitionRequest::Existing { path } => Acquisition::Completed(self.configure_existing(path)),
            AcquisitionRequest::Acquire {
                version,
                destination,
            } => {
                let task = self.task(version, destination);
                Acquisition::Scheduled(self.spawn(task, progress))
            }
        }
    }

    fn configure_existing(&self, path: PathBuf) -> AcquisitionOutcome {
        let key = &self.environment.key;

        if !path.is_dir() {
            warn!("{} is not a directory", path.display());
        }

        match configure_existing(&*self.environment.store, key, &path) {
            Ok(resolved_path) => {
                let message = format!(
                    "{key} configured with {}. {INSTALL_TOOLS_QUESTION}",
                    path.display()
                );
                self.notifier.install_tools(message.clone());
                AcquisitionOutcome::Success {
                    resolved_path,
                    message,
                }
            }
            Err(err) => {
                error!("Cannot configure {key}: {err:?}");
                let message = err.to_string();
                self.notifier.error(message.clone());
                AcquisitionOutcome::Failure { message }
            }
        }
    }

    /// `master` is cloned, every other version is a release archive.
    fn task(&self, version: VersionDescriptor, destination: PathBuf) -> Box<dyn Task> {
        if version.is_master() {
            let config = CloneConfig::new(&self.repository, version.name(), &destination)
                .recurse_submodules(self.recurse_submodules)
                .depth(self.clone_depth);

            return Box::new(CloneTask {
                cloner: self.cloner.clone(),
                config,
                version,
                destination,
                environment: self.environment.clone(),
            });
        }

        Box::new(ArchiveTask {
            fetcher: self.fetcher.clone(),
            version,
            destination,
            environment: self.environment.clone(),
        })
    }

    /// Runs `task` on the runtime and reports its outcome through the notifier.
    pub fn spawn(
        &self,
        task: Box<dyn Task>,
        progress: Arc<dyn ProgressSender<ProgressEvent>>,
    ) -> TaskHandle {
        let title = task.title();
        let mode = task.mode();
        let cancel = CancellationToken::new();
        let (state_tx, state) = watch::channel(AcquisitionState::Idle);
        let notifier = self.notifier.clone();

        let fut = {
            let title = title.clone();
            let cancel = cancel.clone();

            async move {
                info!("{title}");
                let _ = state_tx.send(AcquisitionState::Running(mode));

                let outcome = match task.run(cancel, &*progress).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!("{title} failed: {err:?}");
                        AcquisitionOutcome::Failure {
                            message: err.to_string(),
                        }
                    }
                };

                match &outcome {
                    AcquisitionOutcome::Success { message, .. } => notifier.install_tools(message.clone()),
                    AcquisitionOutcome::Failure { message } => notifier.error(message.clone()),
                    AcquisitionOutcome::Canceled => info!("{title} cancelled"),
                    AcquisitionOutcome::NothingToDownload { status } => {
                        info!("{title} finished without download ({status})");
                    }
                }

                let _ = state_tx.send(outcome.state());
                outcome
            }
        };

        let join = tokio::spawn(fut.instrument(info_span!("acquisition", mode = %mode)));

        TaskHandle {
            title,
            cancel,
            state,
            join,
            notifier: self.notifier.clone(),
        }
    }
}
