//! In-memory host implementations used by tests and the headless adapter.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex, PoisonError,
};

use blight_core::{EffectKind, Material, Position, RegionId, TriggerId};
use dashmap::{DashMap, DashSet};

use crate::host::{CureObserver, EffectSink, LedgerError, LedgerStore, Terrain, TerrainError};

/// Sparse terrain where every unset cell holds [`Material::Air`].
#[derive(Debug, Default)]
pub struct GridTerrain {
    cells: DashMap<Position, Material>,
    unloaded: DashSet<RegionId>,
    writes: AtomicUsize,
}

impl GridTerrain {
    /// Creates an empty terrain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a terrain holding the provided cells.
    #[must_use]
    pub fn with_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = (Position, Material)>,
    {
        let terrain = Self::new();
        for (position, material) in cells {
            terrain.place(position, material);
        }
        terrain
    }

    /// Writes a cell without counting it as an engine write.
    pub fn place(&self, position: Position, material: Material) {
        if material.is_empty() {
            let _ = self.cells.remove(&position);
        } else {
            let _ = self.cells.insert(position, material);
        }
    }

    /// Fills the inclusive box spanned by the two corners with `material`.
    ///
    /// Both corners are taken from the region of `from`.
    pub fn fill(&self, from: Position, to: Position, material: Material) {
        let (x0, x1) = (from.x().min(to.x()), from.x().max(to.x()));
        let (y0, y1) = (from.y().min(to.y()), from.y().max(to.y()));
        let (z0, z1) = (from.z().min(to.z()), from.z().max(to.z()));
        for x in x0..=x1 {
            for y in y0..=y1 {
                for z in z0..=z1 {
                    self.place(Position::new(from.region(), x, y, z), material);
                }
            }
        }
    }

    /// Reads a cell, ignoring whether its region is loaded.
    #[must_use]
    pub fn peek(&self, position: Position) -> Material {
        self.cells
            .get(&position)
            .map_or(Material::Air, |entry| *entry.value())
    }

    /// Makes every cell of the region fail to read or write.
    pub fn unload_region(&self, region: RegionId) {
        let _ = self.unloaded.insert(region);
    }

    /// Makes the region accessible again.
    pub fn load_region(&self, region: RegionId) {
        let _ = self.unloaded.remove(&region);
    }

    /// Number of non-empty cells holding the material.
    #[must_use]
    pub fn count(&self, material: Material) -> usize {
        self.cells
            .iter()
            .filter(|entry| *entry.value() == material)
            .count()
    }

    /// Number of cells holding any corruption material.
    #[must_use]
    pub fn corrupted_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().is_blight())
            .count()
    }

    /// Sorted snapshot of every non-empty cell.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Position, Material)> {
        let mut cells: Vec<(Position, Material)> = self
            .cells
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        cells.sort_unstable_by_key(|(position, _)| *position);
        cells
    }

    /// Number of writes performed through [`Terrain::set_material`].
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn ensure_loaded(&self, position: Position) -> Result<(), TerrainError> {
        if self.unloaded.contains(&position.region()) {
            return Err(TerrainError::Unloaded(position));
        }
        Ok(())
    }
}

impl Terrain for GridTerrain {
    fn material(&self, position: Position) -> Result<Material, TerrainError> {
        self.ensure_loaded(position)?;
        Ok(self.peek(position))
    }

    fn set_material(&self, position: Position, material: Material) -> Result<(), TerrainError> {
        self.ensure_loaded(position)?;
        self.place(position, material);
        let _ = self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Ledger store keeping the saved positions in memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    stored: Mutex<Vec<Position>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryLedgerStore {
    /// Creates a store pre-populated with persisted positions.
    #[must_use]
    pub fn with_positions(positions: Vec<Position>) -> Self {
        Self {
            stored: Mutex::new(positions),
            ..Self::default()
        }
    }

    /// Makes subsequent saves fail until reset.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }

    /// Positions captured by the last successful save.
    #[must_use]
    pub fn stored(&self) -> Vec<Position> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Vec<Position>, LedgerError> {
        Ok(self.stored())
    }

    fn save(&self, positions: &[Position]) -> Result<(), LedgerError> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(LedgerError::Unavailable(String::from(
                "saves are disabled",
            )));
        }

        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        stored.clear();
        stored.extend_from_slice(positions);
        let _ = self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Effect sink that records every request.
#[derive(Debug, Default)]
pub struct EffectLog {
    effects: Mutex<Vec<(Position, EffectKind)>>,
}

impl EffectLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every recorded effect in emission order.
    #[must_use]
    pub fn effects(&self) -> Vec<(Position, EffectKind)> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded effects matching the predicate.
    #[must_use]
    pub fn count<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(EffectKind) -> bool,
    {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, effect)| predicate(*effect))
            .count()
    }
}

impl EffectSink for EffectLog {
    fn emit_effect(&self, position: Position, effect: EffectKind) {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((position, effect));
    }
}

/// Effect sink that discards every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEffects;

impl EffectSink for NoEffects {
    fn emit_effect(&self, _position: Position, _effect: EffectKind) {}
}

/// Cure observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreCures;

impl CureObserver for IgnoreCures {
    fn on_cure_success(&self, _trigger: TriggerId, _reverted: usize) {}
}

/// Cure observer that records every notification.
#[derive(Debug, Default)]
pub struct CureLog {
    cures: Mutex<Vec<(TriggerId, usize)>>,
}

impl CureLog {
    /// Copies every recorded notification in delivery order.
    #[must_use]
    pub fn cures(&self) -> Vec<(TriggerId, usize)> {
        self.cures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CureObserver for CureLog {
    fn on_cure_success(&self, trigger: TriggerId, reverted: usize) {
        self.cures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((trigger, reverted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_cells_read_as_air() {
        let terrain = GridTerrain::new();
        assert_eq!(terrain.material(Position::at(3, 3, 3)), Ok(Material::Air));
    }

    #[test]
    fn writing_air_removes_the_cell() {
        let terrain = GridTerrain::with_cells([(Position::at(0, 0, 0), Material::Dirt)]);
        assert_eq!(terrain.set_material(Position::at(0, 0, 0), Material::Air), Ok(()));
        assert!(terrain.snapshot().is_empty());
        assert_eq!(terrain.writes(), 1);
    }

    #[test]
    fn unloaded_regions_refuse_access() {
        let region = RegionId::new(3);
        let position = Position::new(region, 0, 0, 0);
        let terrain = GridTerrain::new();
        terrain.unload_region(region);
        assert_eq!(
            terrain.material(position),
            Err(TerrainError::Unloaded(position))
        );
        assert!(terrain.set_material(position, Material::Blight).is_err());
        terrain.load_region(region);
        assert_eq!(terrain.set_material(position, Material::Blight), Ok(()));
    }

    #[test]
    fn failing_store_keeps_previous_contents() {
        let store = MemoryLedgerStore::with_positions(vec![Position::at(1, 1, 1)]);
        store.fail_saves(true);
        assert!(store.save(&[Position::at(2, 2, 2)]).is_err());
        assert_eq!(store.stored(), vec![Position::at(1, 1, 1)]);
        store.fail_saves(false);
        assert!(store.save(&[Position::at(2, 2, 2)]).is_ok());
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().ok(), Some(vec![Position::at(2, 2, 2)]));
    }

    #[test]
    fn fill_covers_the_inclusive_box() {
        let terrain = GridTerrain::new();
        terrain.fill(Position::at(-1, 0, -1), Position::at(1, 0, 1), Material::GrassBlock);
        assert_eq!(terrain.count(Material::GrassBlock), 9);
    }
}
