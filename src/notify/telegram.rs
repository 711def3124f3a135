use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::Notifier;
use crate::error::NotifyError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const MESSAGES_PER_MINUTE: u32 = 20; // Telegram group chat limit

type TelegramRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Telegram bot notifier
///
/// Cloneable; all clones share one rate limiter.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    url: String,
    chat_id: String,
    rate_limiter: Arc<TelegramRateLimiter>,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        Self::with_base_url(TELEGRAM_API_BASE, token, chat_id)
    }

    /// Build against a custom API base (used for tests)
    pub fn with_base_url(base_url: &str, token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        let quota = Quota::per_minute(NonZeroU32::new(MESSAGES_PER_MINUTE).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            url: format!("{}/bot{}/sendMessage", base_url.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.rate_limiter.until_ready().await;

        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
        ];
        let response = self.client.post(&self.url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Telegram rejected message: {}", body);
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Telegram message sent");
        Ok(())
    }
}
