#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tendril structures erupting from corrupted ground.
//!
//! Each run picks an anchor among the base cells and grows a structure above
//! it, either by stamping a template from the [`TemplateLibrary`] or, when no
//! template fits, by planning a procedural trunk. Every written cell is
//! recorded with its original material so restoration can undo it.

mod procedural;
mod template;

use blight_core::{
    EffectKind, Event, Material, Position, SpreadWeights, TendrilStrategy, TendrilTuning,
};
use blight_world::{query, Claim, JobContext, TerrainError};
use rand::Rng;
use tracing::{debug, info, warn};

pub use procedural::{plan_procedural, CellProbe, Placement};
pub use template::{
    Mirror, Rotation, Template, TemplateCell, TemplateError, TemplateLibrary, Transform,
};

/// Base cells examined per run when looking for an anchor with clearance.
const ANCHOR_ATTEMPTS: usize = 8;

/// Places tendril structures above base cells.
#[derive(Clone, Debug)]
pub struct TendrilPlacer {
    tuning: TendrilTuning,
    library: TemplateLibrary,
    weights: SpreadWeights,
}

impl TendrilPlacer {
    /// Creates a placer drawing templates from `library`.
    ///
    /// `weights` decides which solid materials a structure may grow through.
    #[must_use]
    pub fn new(tuning: TendrilTuning, library: TemplateLibrary, weights: SpreadWeights) -> Self {
        Self {
            tuning,
            library,
            weights,
        }
    }

    /// Tuning the placer was created with.
    #[must_use]
    pub fn tuning(&self) -> &TendrilTuning {
        &self.tuning
    }

    /// Templates available for stamping.
    #[must_use]
    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Runs one tendril job and returns the number of cells written.
    pub fn run<R>(&self, ctx: &JobContext<'_>, rng: &mut R, out: &mut Vec<Event>) -> usize
    where
        R: Rng + ?Sized,
    {
        if ctx.state().active().len() < self.tuning.min_active {
            return 0;
        }
        if rng.gen::<f64>() >= self.tuning.spawn_chance(ctx.level()) {
            return 0;
        }

        match self.find_anchor(ctx, rng) {
            Some(anchor) => self.grow(ctx, rng, anchor, out),
            None => {
                debug!("no base cell has room for a tendril");
                0
            }
        }
    }

    /// Picks a base cell whose column above is clear enough to grow into.
    pub fn find_anchor<R>(&self, ctx: &JobContext<'_>, rng: &mut R) -> Option<Position>
    where
        R: Rng + ?Sized,
    {
        query::sample_base_cells(ctx.state(), rng, ANCHOR_ATTEMPTS)
            .into_iter()
            .find(|anchor| self.has_clearance(ctx, *anchor))
    }

    /// Reports whether every cell of the column above `anchor` can be grown into.
    #[must_use]
    pub fn has_clearance(&self, ctx: &JobContext<'_>, anchor: Position) -> bool {
        (1..=self.tuning.clearance)
            .all(|dy| self.probe(ctx, anchor.offset(0, dy, 0)) != CellProbe::Blocked)
    }

    /// Grows a structure above `anchor` and returns the number of cells written.
    ///
    /// A template is tried first. Any template failure falls back to a
    /// procedural structure.
    pub fn grow<R>(
        &self,
        ctx: &JobContext<'_>,
        rng: &mut R,
        anchor: Position,
        out: &mut Vec<Event>,
    ) -> usize
    where
        R: Rng + ?Sized,
    {
        let (strategy, cells) = match self.stamp_template(ctx, rng, anchor) {
            Ok(cells) => (TendrilStrategy::Template, cells),
            Err(error) => {
                match &error {
                    TemplateError::NoTemplates | TemplateError::Obstructed { .. } => {
                        debug!(%error, "growing procedural tendril instead");
                    }
                    _ => warn!(%error, "template placement failed; growing procedurally"),
                }
                (TendrilStrategy::Procedural, self.stamp_procedural(ctx, rng, anchor))
            }
        };

        if cells > 0 {
            ctx.host()
                .effects()
                .emit_effect(anchor, EffectKind::TendrilEruption(strategy));
            out.push(Event::TendrilGrown {
                anchor,
                cells,
                strategy,
            });
            info!(anchor = %anchor, cells, ?strategy, "tendril erupted");
        }
        cells
    }

    fn stamp_template<R>(
        &self,
        ctx: &JobContext<'_>,
        rng: &mut R,
        anchor: Position,
    ) -> Result<usize, TemplateError>
    where
        R: Rng + ?Sized,
    {
        let template = self.library.choose(rng)?;
        let transform = Transform::random(rng);

        if let Some(position) = template
            .bounding_volume(anchor, transform)
            .into_iter()
            .find(|position| self.probe(ctx, *position) == CellProbe::Blocked)
        {
            return Err(TemplateError::Obstructed {
                name: template.name().to_owned(),
                position,
            });
        }

        let mut written = 0;
        for (position, material) in template.placements(anchor, transform) {
            let stamped =
                stamp_cell(ctx, position, material).map_err(|source| TemplateError::Write {
                    name: template.name().to_owned(),
                    source,
                })?;
            if stamped {
                written += 1;
            }
        }
        Ok(written)
    }

    fn stamp_procedural<R>(&self, ctx: &JobContext<'_>, rng: &mut R, anchor: Position) -> usize
    where
        R: Rng + ?Sized,
    {
        let plan = plan_procedural(&self.tuning, rng, anchor, |position| {
            self.probe(ctx, position)
        });

        let mut written = 0;
        for Placement { position, material } in plan {
            match stamp_cell(ctx, position, material) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(error) => warn!(%error, "skipping tendril cell"),
            }
        }
        written
    }

    fn probe(&self, ctx: &JobContext<'_>, position: Position) -> CellProbe {
        if !ctx.in_range(position) || ctx.state().ledger().contains(position) {
            return CellProbe::Blocked;
        }
        match ctx.terrain().material(position) {
            Ok(material) if material.is_empty() => CellProbe::Empty,
            Ok(material)
                if material.is_blight()
                    || self.weights.is_spreadable(material)
                    || !ctx.terrain().is_solid(material) =>
            {
                CellProbe::Passable
            }
            Ok(_) | Err(_) => CellProbe::Blocked,
        }
    }
}

/// Records and writes a single structure cell.
///
/// Returns `Ok(true)` when the cell was newly written. Only written cells join
/// the tracked set; cells that were already active keep their record.
fn stamp_cell(
    ctx: &JobContext<'_>,
    position: Position,
    material: Material,
) -> Result<bool, TerrainError> {
    let state = ctx.state();
    if !ctx.in_range(position) || state.is_claimed(position) {
        return Ok(false);
    }

    let original = ctx.terrain().material(position)?;
    match ctx.claim(position, original, material) {
        Claim::Written => {
            let _ = state.structures().insert(position);
            Ok(true)
        }
        Claim::Occupied | Claim::Cured => Ok(false),
        Claim::Failed(error) => Err(error),
    }
}
