//! Plan/mode resolver.
//!
//! Maps a subscription tier to the minimum confidence a signal needs to be
//! dispatched. Mode does not change the threshold; it only adds the
//! approval requirement in the dispatcher.

use tracing::{debug, warn};

use crate::config::{DEFAULT_THRESHOLD, OVERRIDE_RANGE};
use crate::types::{PlanTier, Threshold};

/// Effective threshold for `plan`. Unknown tiers use `override_threshold`
/// when it lies in the accepted range, otherwise the default of 85.
pub fn resolve_threshold(plan: &PlanTier, override_threshold: Option<u8>) -> Threshold {
    let threshold = match plan {
        PlanTier::Free => Threshold::Blocked,
        PlanTier::Lite => Threshold::Min(70),
        PlanTier::Pro => Threshold::Min(85),
        PlanTier::Enterprise => Threshold::Min(90),
        PlanTier::Unknown(label) => match override_threshold {
            Some(t) if OVERRIDE_RANGE.contains(&i64::from(t)) => Threshold::Min(t),
            Some(t) => {
                warn!(plan = %label, threshold = t, "Override threshold out of range, using default");
                Threshold::Min(DEFAULT_THRESHOLD)
            }
            None => {
                warn!(plan = %label, "Unknown plan without override, using default threshold");
                Threshold::Min(DEFAULT_THRESHOLD)
            }
        },
    };
    debug!(plan = %plan, threshold = %threshold, "Threshold resolved");
    threshold
}
