//! Tuning surface controlling every adjustable aspect of a corruption session.
//!
//! All structures deserialize with `#[serde(default)]`, so configuration files
//! only need to mention the knobs they change.

use serde::{Deserialize, Serialize};

use crate::{CorruptionLevel, Material, SpreadWeights};

/// Aggregated tuning knobs for a corruption session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlightConfig {
    /// Seed for the session random source; equal seeds replay identically.
    pub seed: u64,
    /// Maximum distance from the session centre any cell may be converted at.
    pub max_radius: f64,
    /// Delays and periods of the scheduled jobs.
    pub cadence: Cadence,
    /// Frontier expansion and conversion parameters.
    pub propagation: PropagationTuning,
    /// Surface feature placement parameters.
    pub detail: DetailTuning,
    /// Tendril growth parameters.
    pub tendril: TendrilTuning,
    /// Level escalation and surge parameters.
    pub escalation: EscalationTuning,
    /// Cure window extents.
    pub cure: CureTuning,
    /// Batched restoration parameters.
    pub restoration: RestorationTuning,
    /// Ambient sampling parameters.
    pub ambient: AmbientTuning,
}

impl Default for BlightConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_b119_4700_0001,
            max_radius: 500.0,
            cadence: Cadence::default(),
            propagation: PropagationTuning::default(),
            detail: DetailTuning::default(),
            tendril: TendrilTuning::default(),
            escalation: EscalationTuning::default(),
            cure: CureTuning::default(),
            restoration: RestorationTuning::default(),
            ambient: AmbientTuning::default(),
        }
    }
}

/// Delay before the first run and period between runs, in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCadence {
    /// Ticks before the first run.
    pub delay: u64,
    /// Ticks between consecutive runs; zero is treated as one.
    pub period: u64,
}

impl JobCadence {
    /// Creates a cadence descriptor.
    #[must_use]
    pub const fn new(delay: u64, period: u64) -> Self {
        Self { delay, period }
    }
}

/// Cadence of every scheduled job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cadence {
    /// Frontier batch processing.
    pub propagation: JobCadence,
    /// Surface feature placement.
    pub detail: JobCadence,
    /// Tendril growth attempts.
    pub tendril: JobCadence,
    /// Baseline level escalation; the period is the escalation interval.
    pub escalation: JobCadence,
    /// Ambient effects and pulses.
    pub ambient: JobCadence,
    /// Restoration batches after the event stops.
    pub restoration: JobCadence,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            propagation: JobCadence::new(0, 2),
            detail: JobCadence::new(200, 40),
            tendril: JobCadence::new(300, 150),
            escalation: JobCadence::new(1_200, 1_200),
            ambient: JobCadence::new(100, 80),
            restoration: JobCadence::new(0, 2),
        }
    }
}

/// Per-material override of the spread weight table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightOverride {
    /// Material whose weight changes.
    pub material: Material,
    /// Replacement weight; zero or below removes the material from the table.
    pub weight: f64,
}

/// Frontier expansion, acceptance and seeding parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationTuning {
    /// Horizontal half-extent of the neighbour window at level zero; the level is added on top.
    pub neighbor_range: i32,
    /// Lowest vertical offset scanned around an origin.
    pub vertical_below: i32,
    /// Highest vertical offset scanned around an origin; larger than `vertical_below` to favour upward growth.
    pub vertical_above: i32,
    /// Candidates processed per batch at level zero.
    pub batch_base: usize,
    /// Additional candidates processed per batch for every level.
    pub batch_per_level: usize,
    /// Upper clamp of the acceptance probability.
    pub max_chance: f64,
    /// Lowest distance decay so outer edges remain reachable.
    pub distance_floor: f64,
    /// Level multiplier intercept.
    pub level_base: f64,
    /// Level multiplier growth per level.
    pub level_step: f64,
    /// Probability that a fresh conversion immediately queues its own neighbours.
    pub chain_chance: f64,
    /// Probability that a conversion requests the dramatic effect.
    pub dramatic_chance: f64,
    /// Active cells sampled when the frontier runs dry.
    pub refill_sample: usize,
    /// Number of seed rings queued around the centre at start.
    pub seed_rings: u32,
    /// Radial spacing between seed rings.
    pub seed_ring_spacing: f64,
    /// Points per ring; the ring index multiplies it.
    pub seed_points_per_ring: u32,
    /// Lowest vertical offset sampled for each ring point.
    pub seed_vertical_below: i32,
    /// Highest vertical offset sampled for each ring point.
    pub seed_vertical_above: i32,
    /// Queue probability lost per ring.
    pub seed_ring_falloff: f64,
    /// Lowest queue probability of any ring.
    pub seed_ring_floor: f64,
    /// Replacements for the built-in weight table.
    pub weight_overrides: Vec<WeightOverride>,
}

impl PropagationTuning {
    /// Number of frontier entries processed per batch at the provided level.
    #[must_use]
    pub fn batch_size(&self, level: CorruptionLevel) -> usize {
        self.batch_base
            .saturating_add(self.batch_per_level.saturating_mul(usize::from(level.get())))
    }

    /// Horizontal half-extent of the neighbour window at the provided level.
    #[must_use]
    pub fn horizontal_range(&self, level: CorruptionLevel) -> i32 {
        self.neighbor_range.saturating_add(i32::from(level.get())).max(0)
    }

    /// Linear distance decay, floored at [`PropagationTuning::distance_floor`].
    #[must_use]
    pub fn distance_decay(&self, distance: f64, max_radius: f64) -> f64 {
        if max_radius <= 0.0 {
            return self.distance_floor;
        }
        (1.0 - distance / max_radius).max(self.distance_floor)
    }

    /// Linear level multiplier.
    #[must_use]
    pub fn level_factor(&self, level: CorruptionLevel) -> f64 {
        self.level_base + self.level_step * level.as_f64()
    }

    /// Builds the spread weight table including configured overrides.
    #[must_use]
    pub fn weights(&self) -> SpreadWeights {
        SpreadWeights::with_overrides(
            self.weight_overrides
                .iter()
                .map(|entry| (entry.material, entry.weight)),
        )
    }
}

impl Default for PropagationTuning {
    fn default() -> Self {
        Self {
            neighbor_range: 2,
            vertical_below: -2,
            vertical_above: 4,
            batch_base: 25,
            batch_per_level: 5,
            max_chance: 0.8,
            distance_floor: 0.1,
            level_base: 0.5,
            level_step: 0.15,
            chain_chance: 0.6,
            dramatic_chance: 0.3,
            refill_sample: 20,
            seed_rings: 4,
            seed_ring_spacing: 2.5,
            seed_points_per_ring: 8,
            seed_vertical_below: -2,
            seed_vertical_above: 3,
            seed_ring_falloff: 0.2,
            seed_ring_floor: 0.3,
            weight_overrides: Vec::new(),
        }
    }
}

/// Surface feature lottery and vein spreading parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailTuning {
    /// Active cells required before any feature is attempted.
    pub min_active: usize,
    /// Base cells sampled per run at level zero; the level is added on top.
    pub base_samples: usize,
    /// Alarm threshold intercept.
    pub alarm_base: f64,
    /// Alarm threshold growth per level.
    pub alarm_step: f64,
    /// Sensor threshold intercept.
    pub sensor_base: f64,
    /// Sensor threshold growth per level.
    pub sensor_step: f64,
    /// Upper bound of the vein band; draws above it place nothing.
    pub vein_threshold: f64,
    /// Probability that a fresh vein creeps sideways.
    pub vein_spread_chance: f64,
    /// Probability per horizontal neighbour once a vein creeps.
    pub vein_neighbor_chance: f64,
}

impl DetailTuning {
    /// Number of base cells sampled at the provided level.
    #[must_use]
    pub fn samples(&self, level: CorruptionLevel) -> usize {
        self.base_samples.saturating_add(usize::from(level.get()))
    }

    /// Alarm and sensor thresholds at the provided level.
    #[must_use]
    pub fn thresholds(&self, level: CorruptionLevel) -> (f64, f64) {
        let level = level.as_f64();
        (
            self.alarm_base + self.alarm_step * level,
            self.sensor_base + self.sensor_step * level,
        )
    }
}

impl Default for DetailTuning {
    fn default() -> Self {
        Self {
            min_active: 5,
            base_samples: 3,
            alarm_base: 0.05,
            alarm_step: 0.02,
            sensor_base: 0.15,
            sensor_step: 0.03,
            vein_threshold: 0.7,
            vein_spread_chance: 0.3,
            vein_neighbor_chance: 0.4,
        }
    }
}

/// Tendril gating, clearance and procedural growth parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TendrilTuning {
    /// Active cells required before tendrils are attempted.
    pub min_active: usize,
    /// Spawn chance intercept.
    pub chance_base: f64,
    /// Spawn chance growth per level.
    pub chance_step: f64,
    /// Cells above an anchor that must be passable.
    pub clearance: i32,
    /// Shortest procedural trunk.
    pub min_height: i32,
    /// Exclusive upper bound of the procedural trunk height.
    pub max_height: i32,
    /// Layers above which the trunk starts drifting.
    pub drift_start: i32,
    /// Probability that a layer drifts.
    pub drift_chance: f64,
    /// Width of the uniform drift applied per drifting layer.
    pub drift_step: f64,
    /// Layers above which branches may sprout.
    pub branch_min_layer: i32,
    /// Branches only sprout on layers divisible by this value.
    pub branch_every: i32,
    /// Probability that an eligible layer sprouts a branch.
    pub branch_chance: f64,
    /// Shortest branch.
    pub branch_min_len: i32,
    /// Longest branch.
    pub branch_max_len: i32,
}

impl TendrilTuning {
    /// Spawn chance at the provided level.
    #[must_use]
    pub fn spawn_chance(&self, level: CorruptionLevel) -> f64 {
        (self.chance_base + self.chance_step * level.as_f64()).clamp(0.0, 1.0)
    }
}

impl Default for TendrilTuning {
    fn default() -> Self {
        Self {
            min_active: 15,
            chance_base: 0.2,
            chance_step: 0.1,
            clearance: 10,
            min_height: 8,
            max_height: 16,
            drift_start: 3,
            drift_chance: 0.3,
            drift_step: 0.4,
            branch_min_layer: 5,
            branch_every: 4,
            branch_chance: 0.4,
            branch_min_len: 2,
            branch_max_len: 3,
        }
    }
}

/// Surge parameters; the escalation interval lives in [`Cadence::escalation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationTuning {
    /// Ticks a surge keeps the level raised.
    pub surge_duration: u64,
    /// Levels added by a single surge.
    pub surge_boost: u8,
}

impl Default for EscalationTuning {
    fn default() -> Self {
        Self {
            surge_duration: 200,
            surge_boost: 1,
        }
    }
}

/// Extents of the fixed cure window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CureTuning {
    /// Horizontal half-extent on both horizontal axes.
    pub horizontal: i32,
    /// Cells below the origin included in the window.
    pub below: i32,
    /// Cells above the origin included in the window.
    pub above: i32,
}

impl Default for CureTuning {
    fn default() -> Self {
        Self {
            horizontal: 2,
            below: 2,
            above: 3,
        }
    }
}

/// Batched restoration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationTuning {
    /// Cells restored per restoration run.
    pub batch_size: usize,
}

impl Default for RestorationTuning {
    fn default() -> Self {
        Self { batch_size: 50 }
    }
}

/// Ambient sampling parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientTuning {
    /// Active cells receiving ambient particles per run.
    pub effect_samples: usize,
    /// Probability of an ambient sound per run.
    pub sound_chance: f64,
    /// Probability of a corruption pulse per run.
    pub pulse_chance: f64,
    /// Active cells required before pulses happen.
    pub pulse_min_active: usize,
}

impl Default for AmbientTuning {
    fn default() -> Self {
        Self {
            effect_samples: 5,
            sound_chance: 0.3,
            pulse_chance: 0.1,
            pulse_min_active: 10,
        }
    }
}
