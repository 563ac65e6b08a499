//! Pattern memory.
//!
//! Groups similar signals under a deterministic key and counts how often
//! each key has been executed. The count is an eligibility gate for the
//! pattern booster, not a probability.

pub mod learner;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Direction, ExecutionRecord, Signal};

/// Confidence bucket used in pattern keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceBand {
    /// Below 60.
    Low,
    /// 60 to 79.
    SixtyPlus,
    /// 80 and above.
    EightyPlus,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            80.. => ConfidenceBand::EightyPlus,
            60..=79 => ConfidenceBand::SixtyPlus,
            _ => ConfidenceBand::Low,
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBand::Low => write!(f, "low"),
            ConfidenceBand::SixtyPlus => write!(f, "60+"),
            ConfidenceBand::EightyPlus => write!(f, "80+"),
        }
    }
}

/// `SYMBOL_DIRECTION_BAND_TAG`, e.g. `BTCUSDT_BUY_60+_rsi`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternKey(String);

impl PatternKey {
    pub fn derive(symbol: &str, direction: Direction, confidence: u8, reason_tag: &str) -> Self {
        Self(format!(
            "{}_{}_{}_{}",
            symbol,
            direction,
            ConfidenceBand::from_confidence(confidence),
            reason_tag
        ))
    }

    pub fn for_signal(signal: &Signal) -> Self {
        Self::derive(
            &signal.symbol,
            signal.direction,
            signal.confidence,
            &signal.reason_tag(),
        )
    }

    /// Key of an executed record, using its final confidence.
    pub fn for_record(record: &ExecutionRecord) -> Self {
        Self::derive(
            &record.symbol,
            record.direction,
            record.confidence,
            &record.reason_tag(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PatternKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
