use std::fmt::Display;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

/// Something the user should be told about without blocking whoever noticed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A request was rejected before anything was written.
    Warning(String),
    Info(String),
    /// A store operation failed. Local state may already reflect the attempted change.
    StoreFailure { operation: String, message: String },
}

impl Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::Warning(message) | Notification::Info(message) => f.write_str(message),
            Notification::StoreFailure { operation, message } => {
                write!(f, "Failed to {operation}: {message}")
            }
        }
    }
}

/// Sending side of the notification channel. Never waits: when the receiver lags behind or is
/// gone, notifications are dropped and logged instead.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: mpsc::Sender<Notification>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn send(&self, notification: Notification) {
        info!("Notification: {notification}");
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => warn!("Notification channel is full, dropping {n:?}"),
            Err(TrySendError::Closed(_)) => {}
        }
    }

    pub fn warn(&self, message: impl Display) {
        self.send(Notification::Warning(message.to_string()));
    }

    pub fn info(&self, message: impl Display) {
        self.send(Notification::Info(message.to_string()));
    }

    pub fn store_failure(&self, operation: &str, error: &impl Display) {
        self.send(Notification::StoreFailure {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }
}
