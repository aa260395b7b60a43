use tokio::sync::mpsc;

use crate::models::progress::Notification;

/// Sink for terminal import notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, job_id: &str, notification: Notification);
}

/// Writes notifications to the structured log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, job_id: &str, notification: Notification) {
        match &notification {
            Notification::Success { message } => {
                tracing::info!(job_id = %job_id, message = %message, "Import finished");
            }
            Notification::Warning {
                failed_count,
                message,
            } => {
                tracing::warn!(
                    job_id = %job_id,
                    failed_count = failed_count,
                    message = %message,
                    "Import finished with failed rows"
                );
            }
        }
    }
}

/// Forwards notifications to a channel.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<(String, Notification)>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Notification)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, job_id: &str, notification: Notification) {
        if self.tx.send((job_id.to_string(), notification)).is_err() {
            tracing::debug!(job_id = %job_id, "Notification receiver dropped");
        }
    }
}
