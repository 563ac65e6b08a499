//! Webhook order router.
//!
//! POSTs each trade intent as JSON to a configured endpoint. Any 2xx status
//! counts as accepted; the response body is not interpreted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::OrderPlacer;
use crate::types::TradeIntent;

pub struct WebhookBroker {
    client: Client,
    url: String,
}

impl WebhookBroker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl OrderPlacer for WebhookBroker {
    async fn place_order(&self, intent: &TradeIntent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(intent)
            .send()
            .await
            .with_context(|| format!("Order webhook unreachable: {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Order webhook rejected {} ({status}): {body}", intent.symbol);
        }

        debug!(symbol = %intent.symbol, %status, "Order accepted by webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ExecutionMode, Signal};

    #[test]
    fn test_new_keeps_url() {
        let broker = WebhookBroker::new("http://127.0.0.1:9/orders", Duration::from_secs(1)).unwrap();
        assert_eq!(broker.url(), "http://127.0.0.1:9/orders");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        // port 9 (discard) is closed on test hosts
        let broker =
            WebhookBroker::new("http://127.0.0.1:9/orders", Duration::from_millis(500)).unwrap();
        let signal = Signal::new("BTCUSDT", Direction::Buy, 90, "RSI oversold");
        let result = broker
            .place_order(&TradeIntent::from_signal(&signal, ExecutionMode::Auto))
            .await;
        assert!(result.is_err());
    }
}
