use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use idf_core::{
    acquisition::{Acquisition, AcquisitionOutcome, FollowUp, Notification, Notifier, Orchestrator},
    configs::Settings,
    environment::EnvironmentFile,
    progress::{IgnoreProgress, ProgressEvent},
    version::{AcquisitionRequest, VersionDescriptor, VersionsReader},
    IDF_INSTALLER_NAME, IDF_INSTALLER_VERSION,
};
use reqwest::Client;
use tokio::{
    process::Command,
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
};
use tracing::{error, info, warn};

use crate::{
    args::{Cli, Command as CliCommand, ToolsPrompt},
    progress,
};

pub async fn process_args(args: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)
        .await
        .with_context(|| format!("Cannot read settings from {}", args.config.display()))?;
    let client = Client::builder()
        .user_agent(format!("{IDF_INSTALLER_NAME}/{IDF_INSTALLER_VERSION}"))
        .connect_timeout(Duration::from_secs(30))
        .build()?;

    match &args.command {
        CliCommand::Versions => versions(&settings, client).await,
        CliCommand::Install {
            version,
            destination,
            url,
            tools,
        } => install(&settings, client, version, destination, url.as_deref(), *tools).await,
        CliCommand::UseExisting { path, tools } => use_existing(&settings, client, path, *tools).await,
    }
}

fn reader(settings: &Settings, client: Client) -> VersionsReader {
    VersionsReader::new(
        client,
        &settings.versions_url,
        &settings.release_url,
        &settings.repository,
    )
}

fn orchestrator(settings: &Settings, client: Client) -> (Orchestrator, UnboundedReceiver<Notification>) {
    let (notifier, notifications) = Notifier::channel();
    let environment = Arc::new(EnvironmentFile::new(&settings.environment_file));

    (
        Orchestrator::from_settings(settings, client, environment, notifier),
        notifications,
    )
}

pub async fn versions(settings: &Settings, client: Client) -> anyhow::Result<()> {
    let versions = reader(settings, client).versions().await?;

    for version in versions {
        println!("{}: {}", version.name(), version.url());
    }

    Ok(())
}

pub async fn install(
    settings: &Settings,
    client: Client,
    version: &str,
    destination: &Path,
    url: Option<&str>,
    tools: ToolsPrompt,
) -> anyhow::Result<()> {
    let descriptor = match url {
        Some(url) => VersionDescriptor::new(version, url),
        None => reader(settings, client.clone()).descriptor(version),
    };
    info!("Acquiring {descriptor}");

    let (orchestrator, notifications) = orchestrator(settings, client);
    let (tx, rx) = unbounded_channel();

    let acquisition = orchestrator.acquire(AcquisitionRequest::acquire(descriptor, destination), Arc::new(tx));
    let outcome = wait(acquisition, rx).await;

    finish(settings, outcome, notifications, tools).await
}

pub async fn use_existing(settings: &Settings, client: Client, path: &Path, tools: ToolsPrompt) -> anyhow::Result<()> {
    let (orchestrator, notifications) = orchestrator(settings, client);

    let outcome = orchestrator
        .acquire(AcquisitionRequest::existing(path), Arc::new(IgnoreProgress))
        .outcome()
        .await;

    finish(settings, outcome, notifications, tools).await
}

/// Waits for the acquisition while drawing its progress. Ctrl-C cancels it.
async fn wait(acquisition: Acquisition, events: UnboundedReceiver<ProgressEvent>) -> AcquisitionOutcome {
    let handle = match acquisition {
        Acquisition::Completed(outcome) => return outcome,
        Acquisition::Scheduled(handle) => handle,
    };

    let token = handle.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancelling, the current step finishes first");
            token.cancel();
        }
    });
    let bar = tokio::spawn(progress::render(events));

    let outcome = handle.wait().await;
    ctrl_c.abort();
    let _ = bar.await;

    outcome
}

async fn finish(
    settings: &Settings,
    outcome: AcquisitionOutcome,
    mut notifications: UnboundedReceiver<Notification>,
    tools: ToolsPrompt,
) -> anyhow::Result<()> {
    // Everything is posted before the outcome is returned.
    while let Ok(notification) = notifications.try_recv() {
        match notification {
            Notification::Question {
                message,
                follow_up: FollowUp::InstallTools,
            } => {
                if let AcquisitionOutcome::Success { resolved_path, .. } = &outcome {
                    if confirm(tools, &message)? {
                        install_tools(settings, resolved_path).await?;
                    }
                }
            }
            Notification::Error { message } => error!("{message}"),
        }
    }

    match outcome {
        AcquisitionOutcome::Success { resolved_path, .. } => {
            info!(
                "{} is stored in {}",
                settings.env_key,
                settings.environment_file.display()
            );
            println!("{}={}", settings.env_key, resolved_path.display());
            Ok(())
        }
        // The message was already shown through its notification.
        AcquisitionOutcome::Failure { .. } => bail!("ESP-IDF acquisition failed"),
        AcquisitionOutcome::Canceled => {
            warn!("Cancelled");
            Ok(())
        }
        AcquisitionOutcome::NothingToDownload { status } => {
            warn!("Nothing was downloaded ({status})");
            Ok(())
        }
    }
}

fn confirm(tools: ToolsPrompt, message: &str) -> anyhow::Result<bool> {
    if tools.yes {
        return Ok(true);
    }
    if tools.no_tools {
        return Ok(false);
    }

    let answer = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(true)
        .show_default(true)
        .interact()?;

    Ok(answer)
}

/// Runs the configured tools installer with the environment variable pointing at `path`.
async fn install_tools(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    let mut parts = settings.install_tools_command.split_whitespace();
    let Some(program) = parts.next() else {
        warn!("No install tools command configured");
        return Ok(());
    };

    info!("Running {}", settings.install_tools_command);
    let status = Command::new(program)
        .args(parts)
        .env(&settings.env_key, path)
        .status()
        .await
        .with_context(|| format!("Cannot run `{program}`"))?;

    if !status.success() {
        bail!("`{}` exited with {status}", settings.install_tools_command);
    }

    Ok(())
}
