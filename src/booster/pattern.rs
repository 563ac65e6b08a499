//! Pattern booster: rewards signals whose pattern key has been executed
//! often enough according to pattern memory.

use std::collections::BTreeMap;

use super::Booster;
use crate::memory::PatternKey;
use crate::types::Signal;

#[derive(Debug, Clone)]
pub struct PatternBoostConfig {
    /// Occurrences a key needs before it earns the bonus.
    pub min_occurrences: u64,
    pub bonus: u8,
}

impl Default for PatternBoostConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            bonus: 5,
        }
    }
}

pub struct PatternBooster {
    memory: BTreeMap<PatternKey, u64>,
    config: PatternBoostConfig,
}

impl PatternBooster {
    pub fn new(memory: BTreeMap<PatternKey, u64>, config: PatternBoostConfig) -> Self {
        Self { memory, config }
    }

    pub fn occurrences(&self, key: &PatternKey) -> u64 {
        self.memory.get(key).copied().unwrap_or(0)
    }
}

impl Booster for PatternBooster {
    fn name(&self) -> &'static str {
        "PatternBoost"
    }

    fn bonus(&self, signal: &Signal) -> u8 {
        let key = PatternKey::for_signal(signal);
        if self.occurrences(&key) >= self.config.min_occurrences {
            self.config.bonus
        } else {
            0
        }
    }
}
