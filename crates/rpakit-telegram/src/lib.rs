//! Telegram adapter (teloxide).
//!
//! A notifier pinned to one group chat. Flood-wait (`RetryAfter`) responses
//! get a single retry after the server-given delay; everything else maps to
//! [`Error::Telegram`] after being logged.

use async_trait::async_trait;
use teloxide::{prelude::*, types::ParseMode, RequestError};
use tokio::time::sleep;
use tracing::{error, info};

use rpakit_core::{config::TelegramConfig, errors::Error, ports::AlertSink, Result};

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: teloxide::types::ChatId,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(cfg.bot_token.clone()),
            chat_id: teloxide::types::ChatId(cfg.chat_id),
        }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Send a plain-text message to the configured group chat.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        info!(chat_id = self.chat_id.0, "sending message");
        self.with_retry(|| self.bot.send_message(self.chat_id, text.to_string()))
            .await?;
        info!(chat_id = self.chat_id.0, "message sent");
        Ok(())
    }

    /// Send an HTML-formatted message to the configured group chat.
    pub async fn send_html(&self, html: &str) -> Result<()> {
        info!(chat_id = self.chat_id.0, "sending html message");
        self.with_retry(|| {
            self.bot
                .send_message(self.chat_id, html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        info!(chat_id = self.chat_id.0, "message sent");
        Ok(())
    }

    fn map_err(e: RequestError) -> Error {
        error!("telegram request failed: {e}");
        Error::Telegram(format!("{e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl AlertSink for TelegramNotifier {
    async fn send_alert(&self, text: &str) -> Result<()> {
        self.send_message(text).await
    }
}
