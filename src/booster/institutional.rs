//! Institutional booster.
//!
//! Looks for footprints of institutional activity in the accumulated reason
//! text: 3 matches → +10, 2 → +5, fewer → 0.

use super::Booster;
use crate::types::Signal;

/// Phrases matched case-insensitively anywhere in the reason text.
pub const INSTITUTIONAL_MARKERS: [&str; 3] = ["rsi oversold", "macd bullish", "volume spike"];

pub struct InstitutionalBooster;

impl InstitutionalBooster {
    /// How many distinct markers appear in `signal`'s reason text.
    pub fn matches(signal: &Signal) -> usize {
        let text = signal.reason_text().to_lowercase();
        INSTITUTIONAL_MARKERS
            .iter()
            .filter(|marker| text.contains(*marker))
            .count()
    }
}

impl Booster for InstitutionalBooster {
    fn name(&self) -> &'static str {
        "InstBoost"
    }

    fn bonus(&self, signal: &Signal) -> u8 {
        match Self::matches(signal) {
            3 => 10,
            2 => 5,
            _ => 0,
        }
    }
}
