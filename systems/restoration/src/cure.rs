use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use blight_core::{CureTuning, EffectKind, Event, Position, TriggerId};
use blight_world::{HostBindings, SessionState};
use tracing::{debug, error, info, warn};

/// Cures every active cell in the window around `origin`.
///
/// Each position enters the ledger before its active record is taken, so a
/// converted cell is always either active or cured. A cell whose revert fails
/// gets its record back and leaves the ledger again, ready for restoration.
/// Returns the number of cells reverted; a second call over the same window
/// returns zero.
pub fn cure_area(
    state: &SessionState,
    host: &HostBindings,
    tuning: &CureTuning,
    origin: Position,
) -> usize {
    let mut reverted = 0;
    for dx in -tuning.horizontal..=tuning.horizontal {
        for dz in -tuning.horizontal..=tuning.horizontal {
            for dy in -tuning.below..=tuning.above {
                let position = origin.offset(dx, dy, dz);
                if cure_cell(state, host, position) {
                    reverted += 1;
                }
            }
        }
    }
    reverted
}

fn cure_cell(state: &SessionState, host: &HostBindings, position: Position) -> bool {
    if !state.active().contains(position) {
        return false;
    }
    let newly_cured = state.ledger().insert(position);
    let Some(record) = state.active().remove(position) else {
        if newly_cured {
            let _ = state.ledger().remove(position);
        }
        return false;
    };

    if let Err(error) = host.terrain().set_material(position, record.original()) {
        warn!(%error, %position, "failed to revert cured cell; keeping it active");
        if state.active().insert_if_vacant(position, record) && newly_cured {
            let _ = state.ledger().remove(position);
        }
        return false;
    }
    let _ = state.structures().remove(position);
    host.effects().emit_effect(position, EffectKind::Cured);
    true
}

/// Persists the ledger through the host store.
///
/// Failures are logged and reported as `false`; the in-memory ledger stays
/// authoritative.
pub fn save_ledger(state: &SessionState, host: &HostBindings) -> bool {
    let positions = state.ledger().snapshot();
    match host.ledger_store().save(&positions) {
        Ok(()) => {
            debug!(cured = positions.len(), "persisted cured ledger");
            true
        }
        Err(error) => {
            error!(%error, cured = positions.len(), "failed to persist cured ledger");
            false
        }
    }
}

/// Thread-safe entry point for cures delivered outside the tick loop.
///
/// Clones share the session and the acceptance flag the coordinator flips
/// when a session starts or stops.
#[derive(Clone, Debug)]
pub struct CureHandle {
    state: Arc<SessionState>,
    host: HostBindings,
    tuning: CureTuning,
    accepting: Arc<AtomicBool>,
}

impl CureHandle {
    /// Creates a handle that refuses cures until [`CureHandle::set_accepting`] opens it.
    #[must_use]
    pub fn new(state: Arc<SessionState>, host: HostBindings, tuning: CureTuning) -> Self {
        Self {
            state,
            host,
            tuning,
            accepting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens or closes the handle for every clone.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Reports whether cures are currently applied.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Cures the window around `origin` and returns the number of reverted cells.
    ///
    /// Returns zero while no session is active.
    pub fn cure(&self, origin: Position, trigger: Option<TriggerId>) -> usize {
        let mut events = Vec::new();
        self.cure_with_events(origin, trigger, &mut events)
    }

    /// Same as [`CureHandle::cure`], additionally reporting an
    /// [`Event::AreaCured`] when anything was reverted.
    pub fn cure_with_events(
        &self,
        origin: Position,
        trigger: Option<TriggerId>,
        out: &mut Vec<Event>,
    ) -> usize {
        if !self.is_accepting() {
            debug!(origin = %origin, "ignoring cure outside an active session");
            return 0;
        }

        let reverted = cure_area(&self.state, &self.host, &self.tuning, origin);
        if reverted == 0 {
            return 0;
        }

        let _ = save_ledger(&self.state, &self.host);
        if let Some(trigger) = trigger {
            self.host.cure_observer().on_cure_success(trigger, reverted);
        }
        info!(origin = %origin, reverted, "cured corruption");
        out.push(Event::AreaCured { origin, reverted });
        reverted
    }
}
