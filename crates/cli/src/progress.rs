use std::time::Duration;

use idf_core::progress::ProgressEvent;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.dim} {prefix:20!} [{elapsed_precise}] [{bar:20!.bright.yellow/dim.white}] {pos:>3}% {wide_msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("  {spinner:.dim} {prefix:20!} [{elapsed_precise}] {wide_msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Draws the events of one acquisition until the sender goes away.
pub async fn render(mut events: UnboundedReceiver<ProgressEvent>) {
    let bar = ProgressBar::hidden();

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::Begin { task, total } => {
                match total {
                    Some(total) => {
                        bar.set_style(bar_style());
                        bar.set_length(total.into());
                    }
                    None => {
                        bar.set_style(spinner_style());
                        bar.enable_steady_tick(Duration::from_millis(100));
                    }
                }
                bar.set_prefix(task);
                bar.set_draw_target(ProgressDrawTarget::stderr());
            }
            ProgressEvent::Worked { worked, label } => {
                bar.inc(worked.into());
                bar.set_message(label);
            }
            ProgressEvent::Label(label) => bar.set_message(label),
        }
    }

    bar.finish_and_clear();
}
