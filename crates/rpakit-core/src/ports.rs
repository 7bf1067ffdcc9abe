use async_trait::async_trait;

use crate::Result;

/// Outbound alert port.
///
/// Telegram is the first implementation; anything that can push a short
/// operational message (a Slack webhook, an email digest) fits behind the
/// same trait.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, text: &str) -> Result<()>;
}
