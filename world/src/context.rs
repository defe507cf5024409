use blight_core::{CorruptionLevel, Material, Position};
use tracing::warn;

use crate::{
    host::{Terrain, TerrainError},
    CellRecord, HostBindings, SessionState,
};

/// Outcome of [`JobContext::claim`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// The record was stored and the material written.
    Written,
    /// The position was already active; its record is untouched.
    Occupied,
    /// The position was cured before or during the write.
    Cured,
    /// The host refused the write and nothing was recorded.
    Failed(TerrainError),
}

/// Borrowed view of a running session handed to a system for one job run.
#[derive(Clone, Copy, Debug)]
pub struct JobContext<'a> {
    state: &'a SessionState,
    host: &'a HostBindings,
    center: Position,
    max_radius: f64,
    level: CorruptionLevel,
}

impl<'a> JobContext<'a> {
    /// Creates a view over the session centred on `center`.
    #[must_use]
    pub const fn new(
        state: &'a SessionState,
        host: &'a HostBindings,
        center: Position,
        max_radius: f64,
        level: CorruptionLevel,
    ) -> Self {
        Self {
            state,
            host,
            center,
            max_radius,
            level,
        }
    }

    /// Shared session collections.
    #[must_use]
    pub const fn state(&self) -> &'a SessionState {
        self.state
    }

    /// Host collaborators.
    #[must_use]
    pub const fn host(&self) -> &'a HostBindings {
        self.host
    }

    /// Host terrain.
    #[must_use]
    pub fn terrain(&self) -> &'a dyn Terrain {
        self.host.terrain()
    }

    /// Centre of the session.
    #[must_use]
    pub const fn center(&self) -> Position {
        self.center
    }

    /// Maximum conversion distance from the centre.
    #[must_use]
    pub const fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Effective corruption level for this run.
    #[must_use]
    pub const fn level(&self) -> CorruptionLevel {
        self.level
    }

    /// Distance of the position from the centre, `None` across regions.
    #[must_use]
    pub fn distance_from_center(&self, position: Position) -> Option<f64> {
        position.distance_to(self.center)
    }

    /// Reports whether the position lies within the session radius.
    #[must_use]
    pub fn in_range(&self, position: Position) -> bool {
        position.within(self.center, self.max_radius)
    }

    /// Records the cell and writes `placed` into the terrain.
    ///
    /// The ledger is consulted before the record is stored and again after the
    /// write. A cure observed by the second check wins: the record is dropped
    /// and `original` is written back.
    pub fn claim(&self, position: Position, original: Material, placed: Material) -> Claim {
        let state = self.state;
        if state.ledger().contains(position) {
            return Claim::Cured;
        }
        if !state
            .active()
            .insert_if_vacant(position, CellRecord::new(original, placed))
        {
            return Claim::Occupied;
        }
        if let Err(error) = self.terrain().set_material(position, placed) {
            let _ = state.active().remove(position);
            return Claim::Failed(error);
        }
        if state.ledger().contains(position) {
            let _ = state.active().remove(position);
            if let Err(error) = self.terrain().set_material(position, original) {
                warn!(%error, "failed to undo a write on a cured cell");
            }
            return Claim::Cured;
        }
        Claim::Written
    }
}
