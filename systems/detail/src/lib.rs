#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Surface features grown on top of corrupted cells.

use blight_core::{
    CorruptionLevel, DetailTuning, EffectKind, Event, FeatureKind, Material, Position,
};
use blight_world::{query, Claim, JobContext};
use rand::Rng;
use tracing::{debug, warn};

/// Horizontal neighbours a vein may creep into.
const VEIN_DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (1, 0), (-1, 0)];

/// Places alarm, sensor and vein features above base cells.
#[derive(Clone, Debug, Default)]
pub struct DetailGenerator {
    tuning: DetailTuning,
}

impl DetailGenerator {
    /// Creates a generator with the provided tuning.
    #[must_use]
    pub const fn new(tuning: DetailTuning) -> Self {
        Self { tuning }
    }

    /// Tuning the generator was created with.
    #[must_use]
    pub const fn tuning(&self) -> &DetailTuning {
        &self.tuning
    }

    /// Maps a uniform draw in `[0, 1)` onto the feature lottery.
    ///
    /// The alarm and sensor bands widen with the level while the vein band's
    /// upper bound stays fixed, so higher levels trade veins for rarer features.
    #[must_use]
    pub fn choose_feature(&self, roll: f64, level: CorruptionLevel) -> Option<FeatureKind> {
        let (alarm, sensor) = self.tuning.thresholds(level);
        if roll < alarm {
            Some(FeatureKind::Alarm)
        } else if roll < sensor {
            Some(FeatureKind::Sensor)
        } else if roll < self.tuning.vein_threshold {
            Some(FeatureKind::Vein)
        } else {
            None
        }
    }

    /// Runs one detail job and returns the number of features placed.
    pub fn run<R>(&self, ctx: &JobContext<'_>, rng: &mut R, out: &mut Vec<Event>) -> usize
    where
        R: Rng + ?Sized,
    {
        if ctx.state().active().len() < self.tuning.min_active {
            return 0;
        }

        let samples = self.tuning.samples(ctx.level());
        let placed: usize = query::sample_base_cells(ctx.state(), rng, samples)
            .into_iter()
            .map(|base| self.decorate(ctx, rng, base, out))
            .sum();

        if placed > 0 {
            debug!(placed, level = %ctx.level(), "grew surface features");
        }
        placed
    }

    /// Rolls the lottery for the cell above `base` and places the result.
    ///
    /// Returns the number of features placed, including creeping veins.
    pub fn decorate<R>(
        &self,
        ctx: &JobContext<'_>,
        rng: &mut R,
        base: Position,
        out: &mut Vec<Event>,
    ) -> usize
    where
        R: Rng + ?Sized,
    {
        let target = base.above();
        if !is_open(ctx, target) {
            return 0;
        }

        let Some(feature) = self.choose_feature(rng.gen::<f64>(), ctx.level()) else {
            return 0;
        };
        if !place(ctx, target, feature, out) {
            return 0;
        }

        let mut placed = 1;
        if feature == FeatureKind::Vein && rng.gen::<f64>() < self.tuning.vein_spread_chance {
            placed += self.creep(ctx, rng, target, out);
        }
        placed
    }

    fn creep<R>(
        &self,
        ctx: &JobContext<'_>,
        rng: &mut R,
        vein: Position,
        out: &mut Vec<Event>,
    ) -> usize
    where
        R: Rng + ?Sized,
    {
        let mut placed = 0;
        for (dx, dz) in VEIN_DIRECTIONS {
            if rng.gen::<f64>() >= self.tuning.vein_neighbor_chance {
                continue;
            }
            let neighbour = vein.offset(dx, 0, dz);
            if is_open(ctx, neighbour) && place(ctx, neighbour, FeatureKind::Vein, out) {
                placed += 1;
            }
        }
        placed
    }
}

/// Reports whether the cell is empty, in range and neither active nor cured.
fn is_open(ctx: &JobContext<'_>, position: Position) -> bool {
    if !ctx.in_range(position) || ctx.state().is_claimed(position) {
        return false;
    }
    matches!(ctx.terrain().material(position), Ok(material) if material.is_empty())
}

fn place(
    ctx: &JobContext<'_>,
    position: Position,
    feature: FeatureKind,
    out: &mut Vec<Event>,
) -> bool {
    match ctx.claim(position, Material::Air, feature.material()) {
        Claim::Written => {
            ctx.host()
                .effects()
                .emit_effect(position, EffectKind::FeatureGrowth(feature));
            out.push(Event::DetailPlaced { position, feature });
            true
        }
        Claim::Occupied | Claim::Cured => false,
        Claim::Failed(error) => {
            warn!(%error, ?feature, "failed to place surface feature");
            false
        }
    }
}
