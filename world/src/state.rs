//! Concurrent collections shared by every job of a corruption session.
//!
//! Each collection wraps a [`DashMap`] so cures delivered from another thread
//! can mutate the session while the tick loop iterates it. Every mutation is a
//! single map operation; no method holds a shard guard across calls.

use std::{collections::hash_map::DefaultHasher, hash::BuildHasherDefault};

use blight_core::{Material, Position};
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

type FixedState = BuildHasherDefault<DefaultHasher>;

/// Shard count used by every session map so iteration order does not depend
/// on the host's core count.
const SHARD_AMOUNT: usize = 16;

fn position_map<V>() -> DashMap<Position, V, FixedState> {
    DashMap::with_hasher_and_shard_amount(FixedState::default(), SHARD_AMOUNT)
}

fn sorted_keys<V>(map: &DashMap<Position, V, FixedState>) -> Vec<Position> {
    let mut keys: Vec<Position> = map.iter().map(|entry| *entry.key()).collect();
    keys.sort_unstable();
    keys
}

/// Bookkeeping stored for every converted cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRecord {
    original: Material,
    placed: Material,
}

impl CellRecord {
    /// Creates a record capturing the material before and after conversion.
    #[must_use]
    pub const fn new(original: Material, placed: Material) -> Self {
        Self { original, placed }
    }

    /// Material the cell held before the engine touched it.
    #[must_use]
    pub const fn original(&self) -> Material {
        self.original
    }

    /// Material the engine wrote into the cell.
    #[must_use]
    pub const fn placed(&self) -> Material {
        self.placed
    }

    /// Reports whether the cell holds base corruption rather than a decoration.
    #[must_use]
    pub const fn is_base(&self) -> bool {
        matches!(self.placed, Material::Blight)
    }
}

/// Map of currently converted positions to their records.
#[derive(Debug)]
pub struct ActiveCells {
    cells: DashMap<Position, CellRecord, FixedState>,
}

impl ActiveCells {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: position_map(),
        }
    }

    /// Records the cell unless the position is already active.
    ///
    /// Returns `true` when the record was stored. An existing record is never
    /// replaced, so the first captured original material wins.
    pub fn insert_if_vacant(&self, position: Position, record: CellRecord) -> bool {
        match self.cells.entry(position) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let _ = slot.insert(record);
                true
            }
        }
    }

    /// Removes the record, returning it when the position was active.
    pub fn remove(&self, position: Position) -> Option<CellRecord> {
        self.cells.remove(&position).map(|(_, record)| record)
    }

    /// Copies the record stored for the position.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<CellRecord> {
        self.cells.get(&position).map(|entry| *entry.value())
    }

    /// Reports whether the position is active.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains_key(&position)
    }

    /// Number of active cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Sorted snapshot of every active position.
    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        sorted_keys(&self.cells)
    }

    /// Sorted snapshot of the active cells holding base corruption.
    #[must_use]
    pub fn base_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .cells
            .iter()
            .filter(|entry| entry.value().is_base())
            .map(|entry| *entry.key())
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Sorted snapshot of every record.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Position, CellRecord)> {
        let mut records: Vec<(Position, CellRecord)> = self
            .cells
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        records.sort_unstable_by_key(|(position, _)| *position);
        records
    }

    /// Drops every record without touching the terrain.
    pub fn clear(&self) {
        self.cells.clear();
    }
}

impl Default for ActiveCells {
    fn default() -> Self {
        Self::new()
    }
}

/// Unordered set of candidates awaiting a conversion roll.
///
/// Entries are validated when they are taken, not when they are pushed.
#[derive(Debug)]
pub struct Frontier {
    candidates: DashMap<Position, (), FixedState>,
}

impl Frontier {
    /// Creates an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            candidates: position_map(),
        }
    }

    /// Queues the candidate, returning `true` when it was not queued already.
    pub fn push(&self, position: Position) -> bool {
        self.candidates.insert(position, ()).is_none()
    }

    /// Removes up to `limit` candidates in unspecified order.
    pub fn take_batch(&self, limit: usize) -> Vec<Position> {
        let picked: Vec<Position> = self
            .candidates
            .iter()
            .take(limit)
            .map(|entry| *entry.key())
            .collect();

        picked
            .into_iter()
            .filter(|position| self.candidates.remove(position).is_some())
            .collect()
    }

    /// Reports whether the candidate is queued.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.candidates.contains_key(&position)
    }

    /// Number of queued candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Reports whether the frontier drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Drops every candidate.
    pub fn clear(&self) {
        self.candidates.clear();
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

/// Positions permanently excluded from conversion.
#[derive(Debug)]
pub struct CuredLedger {
    positions: DashMap<Position, (), FixedState>,
}

impl CuredLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            positions: position_map(),
        }
    }

    /// Reports whether the position is permanently cured.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.positions.contains_key(&position)
    }

    /// Marks the position as cured, returning `true` when it was not cured already.
    pub fn insert(&self, position: Position) -> bool {
        self.positions.insert(position, ()).is_none()
    }

    /// Forgets a single cured position, returning `true` when it was cured.
    pub fn remove(&self, position: Position) -> bool {
        self.positions.remove(&position).is_some()
    }

    /// Merges the provided positions, returning how many were new.
    pub fn extend<I>(&self, positions: I) -> usize
    where
        I: IntoIterator<Item = Position>,
    {
        positions
            .into_iter()
            .filter(|position| self.insert(*position))
            .count()
    }

    /// Sorted snapshot of every cured position.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Position> {
        sorted_keys(&self.positions)
    }

    /// Number of cured positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Reports whether nothing was cured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Forgets every cured position.
    pub fn clear(&self) {
        self.positions.clear();
    }
}

impl Default for CuredLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Active positions that belong to a tendril.
#[derive(Debug)]
pub struct TrackedStructures {
    cells: DashMap<Position, (), FixedState>,
}

impl TrackedStructures {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: position_map(),
        }
    }

    /// Tracks the position, returning `true` when it was not tracked already.
    pub fn insert(&self, position: Position) -> bool {
        self.cells.insert(position, ()).is_none()
    }

    /// Stops tracking the position.
    pub fn remove(&self, position: Position) -> bool {
        self.cells.remove(&position).is_some()
    }

    /// Reports whether the position is tracked.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains_key(&position)
    }

    /// Number of tracked cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no tendril cell is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Forgets every tracked cell.
    pub fn clear(&self) {
        self.cells.clear();
    }
}

impl Default for TrackedStructures {
    fn default() -> Self {
        Self::new()
    }
}

/// Every collection a session shares between its jobs and the cure path.
#[derive(Debug, Default)]
pub struct SessionState {
    active: ActiveCells,
    frontier: Frontier,
    ledger: CuredLedger,
    structures: TrackedStructures,
}

impl SessionState {
    /// Creates an empty session context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converted cells and their records.
    #[must_use]
    pub fn active(&self) -> &ActiveCells {
        &self.active
    }

    /// Candidates awaiting conversion.
    #[must_use]
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Permanently cured positions.
    #[must_use]
    pub fn ledger(&self) -> &CuredLedger {
        &self.ledger
    }

    /// Tendril bookkeeping.
    #[must_use]
    pub fn structures(&self) -> &TrackedStructures {
        &self.structures
    }

    /// Reports whether the position is either active or cured.
    #[must_use]
    pub fn is_claimed(&self, position: Position) -> bool {
        self.active.contains(position) || self.ledger.contains(position)
    }

    /// Clears the active map, the frontier and the tracked structures.
    ///
    /// The ledger survives; only an explicit reset clears it.
    pub fn clear_transient(&self) {
        debug!(
            active = self.active.len(),
            frontier = self.frontier.len(),
            structures = self.structures.len(),
            "clearing transient session state"
        );
        self.active.clear();
        self.frontier.clear();
        self.structures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_recorded_original_wins() {
        let active = ActiveCells::new();
        let position = Position::at(1, 0, 0);
        assert!(active.insert_if_vacant(
            position,
            CellRecord::new(Material::Dirt, Material::Blight)
        ));
        assert!(!active.insert_if_vacant(
            position,
            CellRecord::new(Material::Blight, Material::Blight)
        ));
        assert_eq!(
            active.get(position).map(|record| record.original()),
            Some(Material::Dirt)
        );
    }

    #[test]
    fn take_batch_removes_what_it_returns() {
        let frontier = Frontier::new();
        for x in 0..10 {
            assert!(frontier.push(Position::at(x, 0, 0)));
        }
        assert!(!frontier.push(Position::at(0, 0, 0)));

        let batch = frontier.take_batch(4);
        assert_eq!(batch.len(), 4);
        assert_eq!(frontier.len(), 6);
        for position in batch {
            assert!(!frontier.contains(position));
        }

        assert_eq!(frontier.take_batch(100).len(), 6);
        assert!(frontier.is_empty());
    }

    #[test]
    fn base_positions_skip_decorations() {
        let active = ActiveCells::new();
        let _ = active.insert_if_vacant(
            Position::at(0, 0, 0),
            CellRecord::new(Material::Dirt, Material::Blight),
        );
        let _ = active.insert_if_vacant(
            Position::at(0, 1, 0),
            CellRecord::new(Material::Air, Material::BlightVein),
        );
        assert_eq!(active.base_positions(), vec![Position::at(0, 0, 0)]);
        assert_eq!(active.positions().len(), 2);
    }

    #[test]
    fn clearing_transient_state_keeps_the_ledger() {
        let state = SessionState::new();
        let cured = Position::at(5, 5, 5);
        let _ = state.ledger().insert(cured);
        let _ = state.frontier().push(Position::at(1, 1, 1));
        let _ = state.structures().insert(Position::at(2, 2, 2));
        let _ = state.active().insert_if_vacant(
            Position::at(2, 2, 2),
            CellRecord::new(Material::Air, Material::Blight),
        );

        state.clear_transient();

        assert!(state.active().is_empty());
        assert!(state.frontier().is_empty());
        assert!(state.structures().is_empty());
        assert!(state.ledger().contains(cured));
        assert!(state.is_claimed(cured));
    }

    #[test]
    fn ledger_extend_counts_new_entries() {
        let ledger = CuredLedger::new();
        let _ = ledger.insert(Position::at(0, 0, 0));
        let added = ledger.extend([Position::at(0, 0, 0), Position::at(1, 0, 0)]);
        assert_eq!(added, 1);
        assert_eq!(
            ledger.snapshot(),
            vec![Position::at(0, 0, 0), Position::at(1, 0, 0)]
        );
    }
}
