//! Operator notifications.
//!
//! Defines the `Notifier` trait (fire-and-forget text messages) and the
//! trade message format. Failures are reported to the caller, which logs
//! them and moves on.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::booster::BoostedSignal;
use crate::types::ExecutionMode;

/// Final confidence at which a dispatch is announced as a big trade.
pub const BIG_TRADE_CONFIDENCE: u8 = 90;

/// Booster stages that must have fired for a big trade.
const BIG_TRADE_MIN_STAGES: usize = 2;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Writes messages to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        info!(message, "Notification");
        Ok(())
    }
}

/// High confidence backed by at least two independent boosters.
pub fn is_big_trade(boosted: &BoostedSignal) -> bool {
    boosted.signal.confidence >= BIG_TRADE_CONFIDENCE
        && boosted.stages_fired() >= BIG_TRADE_MIN_STAGES
}

/// Message announcing one dispatch to the commander.
pub fn format_trade_message(
    commander: &str,
    boosted: &BoostedSignal,
    mode: ExecutionMode,
    order_placed: bool,
) -> String {
    let signal = &boosted.signal;
    let size = if is_big_trade(boosted) { "BIG" } else { "normal" };
    let status = if order_placed {
        "trade complete ✅"
    } else {
        "trade FAILED at broker ⚠️"
    };
    let boosters: Vec<String> = boosted
        .bonuses
        .iter()
        .filter(|b| b.bonus > 0)
        .map(|b| format!("{} +{}", b.stage, b.bonus))
        .collect();

    format!(
        "{commander}, {size} {status}\n📈 {} {} @ {}% [{mode}]\n🧠 {}\n⚡ Boosters: {}",
        signal.symbol,
        signal.direction,
        signal.confidence,
        signal.reason.first().map(String::as_str).unwrap_or("n/a"),
        if boosters.is_empty() {
            "n/a".to_string()
        } else {
            boosters.join(", ")
        },
    )
}
