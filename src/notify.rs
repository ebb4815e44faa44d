// notify.rs — fire-and-forget Telegram notifications
//
// Grounded on original_source's broker/notifications.py
// (`send_telegram_message`), supplementing spec §6's `TELEGRAM_BOT_TOKEN`/
// `TELEGRAM_CHAT_ID` env vars with an actual dispatch path (see
// SPEC_FULL.md §4.12). Dispatch never blocks the processor loop — the
// base engine's own pattern of `tokio::spawn`-ing auxiliary work off the
// hot path (its latency reporter / drawdown monitor tasks in main.rs) is
// reused here for the same reason: a slow or failing Telegram call must
// never stall order placement.
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str);
}

/// No-op notifier used when the token/chat id are unset, or in tests.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    fn notify(&self, text: &str) {
        log::debug!("[NOTIFY] (disabled) {}", text);
    }
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        TelegramNotifier {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }

    /// Build a `Box<dyn Notifier>`, picking the no-op implementation when
    /// credentials are absent — mirrors the Python original silently
    /// no-op'ing `send_telegram_message` when the token/chat id are blank.
    pub fn build(bot_token: &str, chat_id: &str) -> Box<dyn Notifier> {
        if bot_token.is_empty() || chat_id.is_empty() {
            Box::new(NullNotifier)
        } else {
            Box::new(TelegramNotifier::new(bot_token.to_string(), chat_id.to_string()))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn notify(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let http = self.http.clone();
        let chat_id = self.chat_id.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            let resp = http
                .post(&url)
                .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
                .send()
                .await;
            if let Err(e) = resp {
                log::warn!("[NOTIFY] telegram send failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_returns_null_notifier_when_unconfigured() {
        let n = TelegramNotifier::build("", "");
        n.notify("hello");
    }

    #[tokio::test]
    async fn build_returns_telegram_notifier_when_configured() {
        let n = TelegramNotifier::build("tok", "chat");
        n.notify("hello");
    }
}
