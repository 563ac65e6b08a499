//! Outcome booster: rewards signals that already clear the approval bands.

use super::Booster;
use crate::types::Signal;

pub struct OutcomeBooster;

impl Booster for OutcomeBooster {
    fn name(&self) -> &'static str {
        "OutcomeBoost"
    }

    fn bonus(&self, signal: &Signal) -> u8 {
        match signal.confidence {
            70.. => 7,
            60..=69 => 3,
            _ => 0,
        }
    }
}
