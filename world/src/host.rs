//! Boundary the hosting world runtime implements for the engine.

use std::{fmt, io, path::PathBuf, sync::Arc};

use blight_core::{EffectKind, Material, Position, TriggerId};
use thiserror::Error;

use crate::memory::{IgnoreCures, MemoryLedgerStore, NoEffects};

/// Failure reported by a [`Terrain`] implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TerrainError {
    /// The cell lies in a region the host has not loaded.
    #[error("cell {0} lies in an unloaded region")]
    Unloaded(Position),
    /// The host refused the write.
    #[error("host rejected writing {material:?} at {position}")]
    WriteRejected {
        /// Cell that was written.
        position: Position,
        /// Material that was refused.
        material: Material,
    },
}

/// Failure reported by a [`LedgerStore`] implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading or writing the backing file failed.
    #[error("failed to access cured ledger at {path:?}: {source}")]
    Io {
        /// Location of the backing file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The stored ledger could not be encoded or decoded.
    #[error("cured ledger is malformed: {0}")]
    Format(String),
    /// The store refused the request.
    #[error("cured ledger store is unavailable: {0}")]
    Unavailable(String),
}

/// Cell access provided by the host world.
pub trait Terrain: Send + Sync {
    /// Reads the material stored at the position.
    fn material(&self, position: Position) -> Result<Material, TerrainError>;

    /// Writes the material at the position.
    fn set_material(&self, position: Position, material: Material) -> Result<(), TerrainError>;

    /// Reports whether the material obstructs tendril growth.
    fn is_solid(&self, material: Material) -> bool {
        material.is_solid()
    }
}

/// Fire-and-forget sink for visual and audio effects.
pub trait EffectSink: Send + Sync {
    /// Requests the effect at the position.
    fn emit_effect(&self, position: Position, effect: EffectKind);
}

/// Persistence of the cured ledger across process restarts.
pub trait LedgerStore: Send + Sync {
    /// Loads every persisted cured position.
    fn load(&self) -> Result<Vec<Position>, LedgerError>;

    /// Replaces the persisted ledger with the provided positions.
    fn save(&self, positions: &[Position]) -> Result<(), LedgerError>;
}

/// Receiver of successful cures, typically the host's statistics layer.
pub trait CureObserver: Send + Sync {
    /// Called after a cure reverted at least one cell.
    fn on_cure_success(&self, trigger: TriggerId, reverted: usize);
}

/// Bundle of every host collaborator the engine talks to.
#[derive(Clone)]
pub struct HostBindings {
    terrain: Arc<dyn Terrain>,
    effects: Arc<dyn EffectSink>,
    ledger_store: Arc<dyn LedgerStore>,
    cure_observer: Arc<dyn CureObserver>,
}

impl HostBindings {
    /// Binds the terrain with silent effects, an in-memory ledger store and no cure observer.
    #[must_use]
    pub fn new(terrain: Arc<dyn Terrain>) -> Self {
        Self {
            terrain,
            effects: Arc::new(NoEffects),
            ledger_store: Arc::new(MemoryLedgerStore::default()),
            cure_observer: Arc::new(IgnoreCures),
        }
    }

    /// Replaces the effect sink.
    #[must_use]
    pub fn with_effects(mut self, effects: Arc<dyn EffectSink>) -> Self {
        self.effects = effects;
        self
    }

    /// Replaces the ledger store.
    #[must_use]
    pub fn with_ledger_store(mut self, ledger_store: Arc<dyn LedgerStore>) -> Self {
        self.ledger_store = ledger_store;
        self
    }

    /// Replaces the cure observer.
    #[must_use]
    pub fn with_cure_observer(mut self, cure_observer: Arc<dyn CureObserver>) -> Self {
        self.cure_observer = cure_observer;
        self
    }

    /// Host terrain.
    #[must_use]
    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    /// Host effect sink.
    #[must_use]
    pub fn effects(&self) -> &dyn EffectSink {
        self.effects.as_ref()
    }

    /// Host ledger store.
    #[must_use]
    pub fn ledger_store(&self) -> &dyn LedgerStore {
        self.ledger_store.as_ref()
    }

    /// Host cure observer.
    #[must_use]
    pub fn cure_observer(&self) -> &dyn CureObserver {
        self.cure_observer.as_ref()
    }
}

impl fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBindings").finish_non_exhaustive()
    }
}
