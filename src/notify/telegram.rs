//! Telegram notification client.
//!
//! Sends trade messages to one chat through the Bot API. The bot token is
//! kept as a secret and never logged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::Notifier;
use crate::config::AppConfig;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    client: Client,
    bot_token: SecretString,
    chat_id: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString, chat_id: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            bot_token,
            chat_id,
            api_base: API_BASE.to_string(),
        })
    }

    /// Resolve token and chat id from the named environment variables.
    pub fn from_env(token_env: &str, chat_id_env: &str, timeout: Duration) -> Result<Self> {
        let token = AppConfig::resolve_env(token_env)?;
        let chat_id = AppConfig::resolve_env(chat_id_env)?;
        Self::new(SecretString::new(token), chat_id, timeout)
    }

    /// Point the client at another Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn send_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": message,
        });

        let response = self
            .client
            .post(self.send_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Telegram request failed")?;

        // Errors must not carry the request URL: it embeds the bot token.
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["description"].as_str().map(str::to_string))
                .unwrap_or_default();
            anyhow::bail!("Telegram API error ({status}): {description}");
        }

        debug!(chat_id = %self.chat_id, "Telegram message sent");
        Ok(())
    }
}
