//! Pattern learner.
//!
//! Feeds resolved execution records back into pattern memory. Every resolved
//! record increments its key by one, win or loss: memory counts how often a
//! pattern was executed, while the pattern booster reads that count as if it
//! were evidence of success. That mismatch is kept as-is until settlement
//! data is trustworthy enough to count wins only.

use std::sync::Arc;
use tracing::{debug, info};

use super::store::PatternMemoryStore;
use super::PatternKey;
use crate::types::ExecutionRecord;

pub struct PatternLearner {
    store: Arc<PatternMemoryStore>,
}

impl PatternLearner {
    pub fn new(store: Arc<PatternMemoryStore>) -> Self {
        Self { store }
    }

    /// Increment memory for every record in `resolved` that carries a
    /// decided outcome. Pending records are ignored. Returns the number of
    /// increments applied.
    pub fn learn(&self, resolved: &[ExecutionRecord]) -> usize {
        let keys: Vec<PatternKey> = resolved
            .iter()
            .filter(|r| !r.is_pending())
            .map(|r| {
                let key = PatternKey::for_record(r);
                debug!(symbol = %r.symbol, key = %key, outcome = %r.outcome, "Learning pattern");
                key
            })
            .collect();

        if keys.is_empty() {
            return 0;
        }

        let applied = self.store.record_all(keys);
        info!(applied, patterns = self.store.len(), "Pattern memory updated");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ExecutionMode, Outcome, Signal};

    fn resolved(symbol: &str, confidence: u8, reason: &str, outcome: Outcome) -> ExecutionRecord {
        let signal = Signal::new(symbol, Direction::Buy, confidence, reason);
        let mut r = ExecutionRecord::from_signal(&signal, ExecutionMode::Auto);
        r.outcome = outcome;
        r
    }

    #[test]
    fn test_learns_wins_and_losses_alike() {
        let store = Arc::new(PatternMemoryStore::in_memory());
        let learner = PatternLearner::new(Arc::clone(&store));

        let applied = learner.learn(&[
            resolved("BTCUSDT", 73, "RSI oversold", Outcome::Win),
            resolved("BTCUSDT", 75, "RSI oversold", Outcome::Loss),
        ]);

        assert_eq!(applied, 2);
        assert_eq!(store.get(&PatternKey::from("BTCUSDT_BUY_60+_rsi")), 2);
    }

    #[test]
    fn test_pending_records_not_learned() {
        let store = Arc::new(PatternMemoryStore::in_memory());
        let learner = PatternLearner::new(Arc::clone(&store));
        let applied = learner.learn(&[resolved("ETHUSDT", 90, "MACD bullish", Outcome::Pending)]);
        assert_eq!(applied, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_each_pass_increases_by_exactly_one_per_record() {
        let store = Arc::new(PatternMemoryStore::in_memory());
        let learner = PatternLearner::new(Arc::clone(&store));
        let key = PatternKey::from("SOLUSDT_BUY_80+_volume");

        for expected in 1..=3 {
            learner.learn(&[resolved("SOLUSDT", 88, "Volume spike", Outcome::Loss)]);
            assert_eq!(store.get(&key), expected);
        }
    }
}
