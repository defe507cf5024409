#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frontier-driven spreading of corruption through spreadable terrain.
//!
//! Candidates are queued without any roll; the probability of conversion is
//! evaluated when the candidate is taken from the frontier, so the level and
//! distance in effect at that moment decide the outcome. Cured positions are
//! re-checked right before the terrain write and once more afterwards, and a
//! cure that lands in between always wins.

use std::f64::consts::TAU;

use blight_core::{
    CorruptionLevel, EffectKind, Event, Material, Position, PropagationTuning, SpreadWeights,
};
use blight_world::{query, Claim, JobContext};
use rand::Rng;
use tracing::{debug, warn};

/// Tally of a single frontier batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Candidates taken from the frontier.
    pub examined: usize,
    /// Candidates converted into corruption.
    pub converted: usize,
    /// Candidates that lost their conversion roll.
    pub rejected: usize,
    /// Candidates discarded because they were no longer eligible.
    pub discarded: usize,
}

/// Propagation engine evaluating frontier candidates against the weight table.
#[derive(Clone, Debug)]
pub struct Propagation {
    tuning: PropagationTuning,
    weights: SpreadWeights,
}

enum Attempt {
    Converted,
    Rejected,
    Discarded,
}

impl Propagation {
    /// Creates an engine using the tuning and the weight table it describes.
    #[must_use]
    pub fn new(tuning: PropagationTuning) -> Self {
        let weights = tuning.weights();
        Self { tuning, weights }
    }

    /// Tuning the engine was created with.
    #[must_use]
    pub fn tuning(&self) -> &PropagationTuning {
        &self.tuning
    }

    /// Spread weight table consulted for every candidate.
    #[must_use]
    pub fn weights(&self) -> &SpreadWeights {
        &self.weights
    }

    /// Conversion probability of the material at `distance` from the centre.
    ///
    /// Returns `None` when the material is not spreadable.
    #[must_use]
    pub fn acceptance_chance(
        &self,
        material: Material,
        distance: f64,
        max_radius: f64,
        level: CorruptionLevel,
    ) -> Option<f64> {
        let weight = self.weights.weight(material)?;
        let chance = weight
            * self.tuning.distance_decay(distance, max_radius)
            * self.tuning.level_factor(level);
        Some(chance.clamp(0.0, self.tuning.max_chance.max(0.0)))
    }

    /// Queues every eligible cell in the window around `origin`.
    ///
    /// The window spans the level-dependent horizontal range and the
    /// configured vertical offsets. Returns the number of new candidates.
    pub fn enqueue_neighbors(&self, ctx: &JobContext<'_>, origin: Position) -> usize {
        let range = self.tuning.horizontal_range(ctx.level());
        let mut queued = 0;
        for dx in -range..=range {
            for dz in -range..=range {
                for dy in self.tuning.vertical_below..=self.tuning.vertical_above {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    if self.queue_if_eligible(ctx, origin.offset(dx, dy, dz)) {
                        queued += 1;
                    }
                }
            }
        }
        queued
    }

    /// Queues the initial candidates of a session.
    ///
    /// The centre and its 26 immediate neighbours are queued whenever they are
    /// eligible; the surrounding rings are queued with a probability that
    /// falls off with the ring index.
    pub fn seed<R>(&self, ctx: &JobContext<'_>, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let mut queued = self.seed_core(ctx);
        let center = ctx.center();

        for ring in 1..=self.tuning.seed_rings {
            let ring_f = f64::from(ring);
            let radius = ring_f * self.tuning.seed_ring_spacing;
            let points = ring.saturating_mul(self.tuning.seed_points_per_ring);
            let chance =
                (1.0 - ring_f * self.tuning.seed_ring_falloff).max(self.tuning.seed_ring_floor);

            for point in 0..points {
                let angle = TAU * f64::from(point) / f64::from(points);
                let dx = ring_offset(radius * angle.cos());
                let dz = ring_offset(radius * angle.sin());
                for dy in self.tuning.seed_vertical_below..=self.tuning.seed_vertical_above {
                    let candidate = center.offset(dx, dy, dz);
                    if !self.is_eligible(ctx, candidate) {
                        continue;
                    }
                    if rng.gen::<f64>() < chance && ctx.state().frontier().push(candidate) {
                        queued += 1;
                    }
                }
            }
        }

        debug!(center = %center, queued, "seeded frontier");
        queued
    }

    /// Takes up to `limit` candidates and rolls each for conversion.
    pub fn process_batch<R>(
        &self,
        ctx: &JobContext<'_>,
        rng: &mut R,
        limit: usize,
        out: &mut Vec<Event>,
    ) -> BatchOutcome
    where
        R: Rng + ?Sized,
    {
        let mut outcome = BatchOutcome::default();
        for candidate in ctx.state().frontier().take_batch(limit) {
            outcome.examined += 1;
            match self.attempt(ctx, rng, candidate, out) {
                Attempt::Converted => outcome.converted += 1,
                Attempt::Rejected => outcome.rejected += 1,
                Attempt::Discarded => outcome.discarded += 1,
            }
        }
        outcome
    }

    /// Refills a drained frontier from a random sample of base cells.
    ///
    /// When no base cell exists yet the seed around the centre is queued again
    /// so a session whose first rolls all failed keeps making progress.
    pub fn refill<R>(&self, ctx: &JobContext<'_>, rng: &mut R, out: &mut Vec<Event>) -> usize
    where
        R: Rng + ?Sized,
    {
        let origins = query::sample_base_cells(ctx.state(), rng, self.tuning.refill_sample);
        let queued = if origins.is_empty() {
            self.seed_core(ctx)
        } else {
            origins
                .iter()
                .map(|origin| self.enqueue_neighbors(ctx, *origin))
                .sum()
        };

        if queued > 0 {
            out.push(Event::FrontierRefilled {
                sampled: origins.len(),
                queued,
            });
        }
        queued
    }

    /// Queues the neighbourhood of every base cell.
    pub fn reseed_from_base(&self, ctx: &JobContext<'_>) -> usize {
        ctx.state()
            .active()
            .base_positions()
            .into_iter()
            .map(|origin| self.enqueue_neighbors(ctx, origin))
            .sum()
    }

    /// Runs one propagation job: refills a drained frontier, then processes a
    /// batch sized by the current level.
    pub fn run<R>(&self, ctx: &JobContext<'_>, rng: &mut R, out: &mut Vec<Event>) -> BatchOutcome
    where
        R: Rng + ?Sized,
    {
        if ctx.state().frontier().is_empty() {
            let _ = self.refill(ctx, rng, out);
        }

        let outcome = self.process_batch(ctx, rng, self.tuning.batch_size(ctx.level()), out);
        if outcome.examined > 0 {
            debug!(
                examined = outcome.examined,
                converted = outcome.converted,
                rejected = outcome.rejected,
                discarded = outcome.discarded,
                frontier = ctx.state().frontier().len(),
                "processed propagation batch"
            );
        }
        outcome
    }

    fn seed_core(&self, ctx: &JobContext<'_>) -> usize {
        let center = ctx.center();
        let mut queued = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if self.queue_if_eligible(ctx, center.offset(dx, dy, dz)) {
                        queued += 1;
                    }
                }
            }
        }
        queued
    }

    fn queue_if_eligible(&self, ctx: &JobContext<'_>, candidate: Position) -> bool {
        self.is_eligible(ctx, candidate) && ctx.state().frontier().push(candidate)
    }

    fn is_eligible(&self, ctx: &JobContext<'_>, candidate: Position) -> bool {
        if !ctx.in_range(candidate) || ctx.state().is_claimed(candidate) {
            return false;
        }
        match ctx.terrain().material(candidate) {
            Ok(material) => self.weights.is_spreadable(material),
            Err(_) => false,
        }
    }

    fn attempt<R>(
        &self,
        ctx: &JobContext<'_>,
        rng: &mut R,
        candidate: Position,
        out: &mut Vec<Event>,
    ) -> Attempt
    where
        R: Rng + ?Sized,
    {
        if ctx.state().is_claimed(candidate) {
            return Attempt::Discarded;
        }
        let Some(distance) = ctx
            .distance_from_center(candidate)
            .filter(|distance| *distance <= ctx.max_radius())
        else {
            return Attempt::Discarded;
        };
        let material = match ctx.terrain().material(candidate) {
            Ok(material) => material,
            Err(error) => {
                debug!(%error, "skipping unreadable frontier candidate");
                return Attempt::Discarded;
            }
        };
        let Some(chance) =
            self.acceptance_chance(material, distance, ctx.max_radius(), ctx.level())
        else {
            return Attempt::Discarded;
        };
        if rng.gen::<f64>() >= chance {
            return Attempt::Rejected;
        }

        match ctx.claim(candidate, material, Material::Blight) {
            Claim::Written => {}
            Claim::Occupied => return Attempt::Discarded,
            Claim::Cured => {
                debug!(position = %candidate, "cured cell skipped during conversion");
                return Attempt::Discarded;
            }
            Claim::Failed(error) => {
                warn!(%error, "failed to convert frontier candidate");
                return Attempt::Discarded;
            }
        }

        let dramatic = rng.gen::<f64>() < self.tuning.dramatic_chance;
        ctx.host()
            .effects()
            .emit_effect(candidate, EffectKind::Conversion { dramatic });
        out.push(Event::CellCorrupted {
            position: candidate,
            original: material,
        });

        if rng.gen::<f64>() < self.tuning.chain_chance {
            let _ = self.enqueue_neighbors(ctx, candidate);
        }
        Attempt::Converted
    }
}

fn ring_offset(value: f64) -> i32 {
    // Ring radii stay far below the i32 range.
    value.floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Propagation {
        Propagation::new(PropagationTuning::default())
    }

    #[test]
    fn chance_is_capped() {
        let chance = engine()
            .acceptance_chance(Material::MangroveLeaves, 0.0, 500.0, CorruptionLevel::MAX)
            .expect("leaves spread");
        assert!((chance - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn chance_decays_with_distance_but_stays_positive() {
        let engine = engine();
        let near = engine
            .acceptance_chance(Material::Stone, 1.0, 100.0, CorruptionLevel::MIN)
            .expect("stone spreads");
        let far = engine
            .acceptance_chance(Material::Stone, 100.0, 100.0, CorruptionLevel::MIN)
            .expect("stone spreads");
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn chance_grows_with_level() {
        let engine = engine();
        let low = engine
            .acceptance_chance(Material::Deepslate, 0.0, 100.0, CorruptionLevel::MIN)
            .expect("deepslate spreads");
        let high = engine
            .acceptance_chance(Material::Deepslate, 0.0, 100.0, CorruptionLevel::new(3))
            .expect("deepslate spreads");
        assert!(high > low);
    }

    #[test]
    fn unknown_materials_have_no_chance() {
        assert_eq!(
            engine().acceptance_chance(Material::Bedrock, 0.0, 100.0, CorruptionLevel::MIN),
            None
        );
    }

    #[test]
    fn ring_offsets_floor_towards_negative_infinity() {
        assert_eq!(ring_offset(-0.5), -1);
        assert_eq!(ring_offset(2.5), 2);
    }
}
