use std::collections::VecDeque;

use blight_core::{EffectKind, Event, Position, RestorationTuning};
use blight_world::{HostBindings, SessionState};
use tracing::{info, warn};

/// Batched revert of every cell recorded by a stopped session.
#[derive(Clone, Debug)]
pub struct Restoration {
    pending: VecDeque<Position>,
    restored: usize,
    batch_size: usize,
}

impl Restoration {
    /// Snapshots the active cells awaiting restoration.
    ///
    /// Call only after every periodic job is cancelled so no cell is recorded
    /// behind the snapshot.
    #[must_use]
    pub fn begin(state: &SessionState, tuning: &RestorationTuning) -> Self {
        Self {
            pending: state.active().positions().into(),
            restored: 0,
            batch_size: tuning.batch_size.max(1),
        }
    }

    /// Cells still awaiting restoration.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Cells reverted so far.
    #[must_use]
    pub const fn restored(&self) -> usize {
        self.restored
    }

    /// Reports whether nothing is left to restore.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    /// Restores the next batch.
    ///
    /// Returns `true` once the last batch ran, after the transient
    /// collections are cleared and [`Event::RestorationCompleted`] is pushed.
    pub fn run_batch(
        &mut self,
        state: &SessionState,
        host: &HostBindings,
        out: &mut Vec<Event>,
    ) -> bool {
        let take = self.batch_size.min(self.pending.len());
        for position in self.pending.drain(..take) {
            if restore_cell(state, host, position) {
                self.restored += 1;
            }
        }

        if self.pending.is_empty() {
            self.complete(state, out);
            return true;
        }
        out.push(Event::RestorationProgress {
            restored: self.restored,
            remaining: self.pending.len(),
        });
        false
    }

    /// Drains every remaining batch synchronously and returns the total restored.
    pub fn finish(
        &mut self,
        state: &SessionState,
        host: &HostBindings,
        out: &mut Vec<Event>,
    ) -> usize {
        while !self.run_batch(state, host, out) {}
        self.restored
    }

    fn complete(&self, state: &SessionState, out: &mut Vec<Event>) {
        state.clear_transient();
        info!(restored = self.restored, "restoration completed");
        out.push(Event::RestorationCompleted {
            restored: self.restored,
        });
    }
}

fn restore_cell(state: &SessionState, host: &HostBindings, position: Position) -> bool {
    // Cells cured after the snapshot were already reverted.
    let Some(record) = state.active().remove(position) else {
        return false;
    };
    let _ = state.structures().remove(position);
    match host.terrain().set_material(position, record.original()) {
        Ok(()) => {
            host.effects().emit_effect(position, EffectKind::Restored);
            true
        }
        Err(error) => {
            warn!(%error, "skipping cell during restoration");
            false
        }
    }
}
