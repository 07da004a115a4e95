use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

pub const INSTALL_TOOLS_QUESTION: &str =
    "This might require a new set of tools to be installed. Do you want to install them?";

/// Action the presentation layer runs when the user answers a question with yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    InstallTools,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Acquisition succeeded. Ask the user whether to run `follow_up`.
    Question { message: String, follow_up: FollowUp },
    Error { message: String },
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Question { message, .. } | Notification::Error { message } => message,
        }
    }
}

/// Posts notifications to the single consumer that presents them.
///
/// Posting never blocks and never fails. Notifications sent after the consumer
/// went away are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: UnboundedSender<Notification>,
}

impl Notifier {
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn install_tools(&self, message: impl Into<String>) {
        self.post(Notification::Question {
            message: message.into(),
            follow_up: FollowUp::InstallTools,
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(Notification::Error {
            message: message.into(),
        });
    }

    fn post(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification receiver is gone");
        }
    }
}
