#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared session state and host boundary for the Blight corruption engine.
//!
//! The [`SessionState`] context is owned by the lifecycle coordinator behind an
//! `Arc` and lent to every system. Systems never talk to the host directly;
//! they go through the traits in [`host`], bundled as [`HostBindings`].

mod context;
pub mod host;
mod memory;
mod state;

pub use context::{Claim, JobContext};
pub use host::{
    CureObserver, EffectSink, HostBindings, LedgerError, LedgerStore, Terrain, TerrainError,
};
pub use memory::{CureLog, EffectLog, GridTerrain, IgnoreCures, MemoryLedgerStore, NoEffects};
pub use state::{ActiveCells, CellRecord, CuredLedger, Frontier, SessionState, TrackedStructures};

/// Query functions that provide read-only access to the session state.
pub mod query {
    use blight_core::Position;
    use rand::{seq::SliceRandom, Rng};

    use super::SessionState;

    /// Picks up to `limit` distinct base cells uniformly at random.
    ///
    /// Sampling runs over a sorted snapshot so equal seeds pick equal cells.
    #[must_use]
    pub fn sample_base_cells<R>(state: &SessionState, rng: &mut R, limit: usize) -> Vec<Position>
    where
        R: Rng + ?Sized,
    {
        let base = state.active().base_positions();
        base.choose_multiple(rng, limit).copied().collect()
    }

    /// Picks up to `limit` distinct active cells of any kind uniformly at random.
    #[must_use]
    pub fn sample_active_cells<R>(
        state: &SessionState,
        rng: &mut R,
        limit: usize,
    ) -> Vec<Position>
    where
        R: Rng + ?Sized,
    {
        let active = state.active().positions();
        active.choose_multiple(rng, limit).copied().collect()
    }

    /// Picks a single random base cell.
    #[must_use]
    pub fn random_base_cell<R>(state: &SessionState, rng: &mut R) -> Option<Position>
    where
        R: Rng + ?Sized,
    {
        state.active().base_positions().choose(rng).copied()
    }

    /// Number of active cells holding base corruption.
    #[must_use]
    pub fn base_cell_count(state: &SessionState) -> usize {
        state.active().base_positions().len()
    }
}
