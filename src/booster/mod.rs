//! Confidence booster chain.
//!
//! Three stages run in a fixed order over the whole batch:
//! outcome → pattern → institutional. Each stage reads the signal produced
//! by the previous one, adds a bonus (clamped to 100) and appends an
//! annotation naming itself and the bonus.

pub mod institutional;
pub mod outcome;
pub mod pattern;

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::memory::PatternKey;
use crate::types::Signal;
use institutional::InstitutionalBooster;
use outcome::OutcomeBooster;
use pattern::{PatternBoostConfig, PatternBooster};

/// A single confidence adjustment stage.
pub trait Booster: Send + Sync {
    /// Label used in reason annotations.
    fn name(&self) -> &'static str;

    /// Bonus this stage grants `signal`, before clamping.
    fn bonus(&self, signal: &Signal) -> u8;

    /// Apply the stage, returning the new signal and the bonus granted.
    fn apply(&self, signal: &Signal) -> (Signal, u8) {
        let bonus = self.bonus(signal);
        let boosted = signal.boosted(bonus, format!("{} {}%", self.name(), bonus));
        (boosted, bonus)
    }
}

/// Bonus one stage granted one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBonus {
    pub stage: &'static str,
    pub bonus: u8,
}

/// A signal after the chain, with the per-stage bonuses that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedSignal {
    pub signal: Signal,
    pub bonuses: Vec<StageBonus>,
}

impl BoostedSignal {
    /// A signal that bypassed the chain.
    pub fn unboosted(signal: Signal) -> Self {
        Self {
            signal,
            bonuses: Vec::new(),
        }
    }

    /// Number of stages that granted a non-zero bonus.
    pub fn stages_fired(&self) -> usize {
        self.bonuses.iter().filter(|b| b.bonus > 0).count()
    }

    pub fn total_bonus(&self) -> u32 {
        self.bonuses.iter().map(|b| u32::from(b.bonus)).sum()
    }
}

/// The three stages in their fixed order.
pub struct BoosterChain {
    outcome: OutcomeBooster,
    pattern: PatternBooster,
    institutional: InstitutionalBooster,
}

impl BoosterChain {
    /// Build a chain whose pattern stage reads `memory` (a snapshot taken
    /// at the start of the cycle).
    pub fn new(memory: BTreeMap<PatternKey, u64>) -> Self {
        Self::with_pattern_config(memory, PatternBoostConfig::default())
    }

    pub fn with_pattern_config(memory: BTreeMap<PatternKey, u64>, config: PatternBoostConfig) -> Self {
        Self {
            outcome: OutcomeBooster,
            pattern: PatternBooster::new(memory, config),
            institutional: InstitutionalBooster,
        }
    }

    fn stages(&self) -> [&dyn Booster; 3] {
        [&self.outcome, &self.pattern, &self.institutional]
    }

    /// Run every stage once over one signal.
    pub fn boost(&self, signal: &Signal) -> BoostedSignal {
        let mut current = signal.clone();
        let mut bonuses = Vec::with_capacity(3);
        for stage in self.stages() {
            let (next, bonus) = stage.apply(&current);
            bonuses.push(StageBonus {
                stage: stage.name(),
                bonus,
            });
            current = next;
        }
        debug!(
            symbol = %current.symbol,
            from = signal.confidence,
            to = current.confidence,
            "Signal boosted"
        );
        BoostedSignal {
            signal: current,
            bonuses,
        }
    }

    /// Run the chain over a batch. Every signal is processed; stages never
    /// fail on an individual signal.
    pub fn boost_batch(&self, signals: &[Signal]) -> Vec<BoostedSignal> {
        let boosted: Vec<BoostedSignal> = signals.iter().map(|s| self.boost(s)).collect();
        info!(
            count = boosted.len(),
            raised = boosted.iter().filter(|b| b.total_bonus() > 0).count(),
            "Booster chain applied"
        );
        boosted
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
