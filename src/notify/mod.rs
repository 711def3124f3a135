// Outbound notifications
pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::error::NotifyError;

/// Best-effort outbound message channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes messages to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(message = %text, "📣 Notification");
        Ok(())
    }
}
