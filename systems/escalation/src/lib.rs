#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Corruption level controller.
//!
//! The baseline only ever rises within a session. Surges are tracked
//! individually on top of it, so removing one surge restores exactly the
//! level the remaining surges and the current baseline describe.

use std::collections::BTreeMap;

use blight_core::{CorruptionLevel, EscalationTuning, Event};
use tracing::info;

/// Identifier of a single surge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurgeId(u64);

impl SurgeId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Tracks the baseline level and the surges stacked on top of it.
#[derive(Clone, Debug)]
pub struct LevelController {
    baseline: CorruptionLevel,
    surges: BTreeMap<SurgeId, u8>,
    next_surge: u64,
    tuning: EscalationTuning,
}

impl LevelController {
    /// Creates a controller at the minimum level.
    #[must_use]
    pub fn new(tuning: EscalationTuning) -> Self {
        Self {
            baseline: CorruptionLevel::MIN,
            surges: BTreeMap::new(),
            next_surge: 0,
            tuning,
        }
    }

    /// Effective level including every active surge.
    #[must_use]
    pub fn level(&self) -> CorruptionLevel {
        let boost = self
            .surges
            .values()
            .fold(0_u8, |total, boost| total.saturating_add(*boost));
        self.baseline.raised_by(boost)
    }

    /// Level without surges.
    #[must_use]
    pub const fn baseline(&self) -> CorruptionLevel {
        self.baseline
    }

    /// Number of surges currently raising the level.
    #[must_use]
    pub fn active_surges(&self) -> usize {
        self.surges.len()
    }

    /// Ticks a surge lasts.
    #[must_use]
    pub const fn surge_duration(&self) -> u64 {
        self.tuning.surge_duration
    }

    /// Returns to the minimum level and forgets every surge.
    pub fn reset(&mut self) {
        self.baseline = CorruptionLevel::MIN;
        self.surges.clear();
    }

    /// Raises the baseline by one step unless it reached the cap.
    pub fn escalate(&mut self, out: &mut Vec<Event>) -> bool {
        if self.baseline.is_max() {
            return false;
        }

        self.baseline = self.baseline.raised_by(1);
        let level = self.level();
        info!(baseline = %self.baseline, effective = %level, "corruption intensified");
        out.push(Event::LevelEscalated { level });
        true
    }

    /// Starts a surge and returns its identifier for the later expiry.
    pub fn begin_surge(&mut self, out: &mut Vec<Event>) -> SurgeId {
        let id = SurgeId(self.next_surge);
        self.next_surge = self.next_surge.wrapping_add(1);
        let _ = self.surges.insert(id, self.tuning.surge_boost);

        let level = self.level();
        info!(surge = id.get(), effective = %level, "corruption surge started");
        out.push(Event::SurgeStarted { level });
        id
    }

    /// Ends the surge, returning `false` when it already ended.
    pub fn end_surge(&mut self, id: SurgeId, out: &mut Vec<Event>) -> bool {
        if self.surges.remove(&id).is_none() {
            return false;
        }

        let level = self.level();
        info!(surge = id.get(), effective = %level, "corruption surge expired");
        out.push(Event::SurgeExpired { level });
        true
    }
}

impl Default for LevelController {
    fn default() -> Self {
        Self::new(EscalationTuning::default())
    }
}
