#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Event lifecycle coordinator.
//!
//! The [`Coordinator`] owns the session state and every system. It moves
//! between [`Phase::Idle`], [`Phase::Active`] and [`Phase::Restoring`], and
//! runs the periodic jobs from a [`TickScheduler`] the host pumps by calling
//! [`Coordinator::tick`] once per world tick.

mod ambient;
mod scheduler;

use std::sync::Arc;

use blight_core::{
    BlightConfig, Command, CorruptionLevel, EffectKind, Event, EventStatus, JobCadence, Phase,
    Position, TriggerId,
};
use blight_system_detail::DetailGenerator;
use blight_system_escalation::{LevelController, SurgeId};
use blight_system_propagation::Propagation;
use blight_system_restoration::{save_ledger, CureHandle, Restoration};
use blight_system_tendril::{TemplateLibrary, TendrilPlacer};
use blight_world::{HostBindings, JobContext, SessionState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, info, warn};

pub use scheduler::{JobHandle, TickScheduler};

/// Periodic and one-shot work driven by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    /// Processes a frontier batch.
    Propagation,
    /// Grows surface features.
    Detail,
    /// Attempts a tendril eruption.
    Tendril,
    /// Raises the baseline level.
    Escalation,
    /// Emits ambient effects and pulses.
    Ambient,
    /// Restores the next batch after the session stopped.
    Restoration,
    /// Ends a surge started by a forced spread.
    SurgeExpiry(SurgeId),
}

impl Job {
    const fn runs_while(self, phase: Phase) -> bool {
        match self {
            Self::Restoration => matches!(phase, Phase::Restoring),
            _ => matches!(phase, Phase::Active),
        }
    }
}

/// Drives a corruption session from start to full restoration.
#[derive(Debug)]
pub struct Coordinator {
    config: BlightConfig,
    host: HostBindings,
    state: Arc<SessionState>,
    cures: CureHandle,
    scheduler: TickScheduler<Job>,
    propagation: Propagation,
    detail: DetailGenerator,
    tendrils: TendrilPlacer,
    levels: LevelController,
    restoration: Option<Restoration>,
    phase: Phase,
    center: Option<Position>,
    rng: ChaCha8Rng,
}

impl Coordinator {
    /// Creates an idle coordinator with the built-in tendril templates.
    ///
    /// The persisted ledger is loaded right away so status queries report it
    /// before the first session starts.
    #[must_use]
    pub fn new(config: BlightConfig, host: HostBindings) -> Self {
        Self::with_templates(config, host, TemplateLibrary::builtin())
    }

    /// Creates an idle coordinator drawing tendrils from `library`.
    #[must_use]
    pub fn with_templates(config: BlightConfig, host: HostBindings, library: TemplateLibrary) -> Self {
        let state = Arc::new(SessionState::new());
        let propagation = Propagation::new(config.propagation.clone());
        let tendrils = TendrilPlacer::new(
            config.tendril.clone(),
            library,
            propagation.weights().clone(),
        );
        let coordinator = Self {
            cures: CureHandle::new(state.clone(), host.clone(), config.cure.clone()),
            detail: DetailGenerator::new(config.detail.clone()),
            levels: LevelController::new(config.escalation.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            scheduler: TickScheduler::new(),
            restoration: None,
            phase: Phase::Idle,
            center: None,
            propagation,
            tendrils,
            state,
            host,
            config,
        };
        let _ = coordinator.merge_persisted_ledger();
        coordinator
    }

    /// Starts a session centred on `center`.
    ///
    /// Returns `false` while a session is already active. A restoration still
    /// draining from the previous session is finished first.
    pub fn start_event(&mut self, center: Position, out: &mut Vec<Event>) -> bool {
        if self.phase == Phase::Active {
            info!(center = %center, "corruption event already active");
            return false;
        }
        if self.phase == Phase::Restoring {
            let _ = self.finish_now(out);
        }

        self.levels.reset();
        self.state.clear_transient();
        let _ = self.merge_persisted_ledger();
        self.center = Some(center);
        self.phase = Phase::Active;
        self.cures.set_accepting(true);

        let ctx = JobContext::new(
            &self.state,
            &self.host,
            center,
            self.config.max_radius,
            self.levels.level(),
        );
        let queued = self.propagation.seed(&ctx, &mut self.rng);
        self.host
            .effects()
            .emit_effect(center, EffectKind::Awakening);

        let cadence = &self.config.cadence;
        for (job, timing) in [
            (Job::Propagation, cadence.propagation),
            (Job::Detail, cadence.detail),
            (Job::Tendril, cadence.tendril),
            (Job::Escalation, cadence.escalation),
            (Job::Ambient, cadence.ambient),
        ] {
            let _ = schedule(&mut self.scheduler, job, timing);
        }

        info!(center = %center, queued, "corruption event started");
        out.push(Event::EventStarted { center, queued });
        true
    }

    /// Stops the active session and begins restoring every recorded cell.
    ///
    /// Returns `false` unless a session is active. Every job is cancelled
    /// before the restoration snapshot is taken.
    pub fn stop_event(&mut self, out: &mut Vec<Event>) -> bool {
        if self.phase != Phase::Active {
            info!("no corruption event to stop");
            return false;
        }

        self.cures.set_accepting(false);
        let cancelled = self.scheduler.cancel_all();
        self.levels.reset();

        let mut restoration = Restoration::begin(&self.state, &self.config.restoration);
        let pending = restoration.remaining();
        info!(pending, cancelled, "corruption event stopped");
        out.push(Event::EventStopped { pending });

        if restoration.is_drained() {
            let _ = restoration.run_batch(&self.state, &self.host, out);
            self.phase = Phase::Idle;
        } else {
            let _ = schedule(
                &mut self.scheduler,
                Job::Restoration,
                self.config.cadence.restoration,
            );
            self.restoration = Some(restoration);
            self.phase = Phase::Restoring;
        }
        true
    }

    /// Re-seeds the frontier from every base cell and starts a surge.
    ///
    /// Returns `false` when no session is active.
    pub fn force_spread(&mut self, out: &mut Vec<Event>) -> bool {
        let Some(center) = self.active_center() else {
            return false;
        };

        let ctx = JobContext::new(
            &self.state,
            &self.host,
            center,
            self.config.max_radius,
            self.levels.level(),
        );
        let queued = self.propagation.reseed_from_base(&ctx);
        let surge = self.levels.begin_surge(out);
        let _ = self.scheduler.schedule_once(
            Job::SurgeExpiry(surge),
            self.levels.surge_duration(),
        );
        info!(queued, surge = surge.get(), "forced corruption spread");
        true
    }

    /// Cures the window around `origin` and returns the number of reverted cells.
    ///
    /// Returns zero unless a session is active.
    pub fn cure(
        &mut self,
        origin: Position,
        trigger: Option<TriggerId>,
        out: &mut Vec<Event>,
    ) -> usize {
        self.cures.cure_with_events(origin, trigger, out)
    }

    /// Handle for delivering cures from other threads.
    #[must_use]
    pub fn cure_handle(&self) -> CureHandle {
        self.cures.clone()
    }

    /// Advances the scheduler by one tick and runs every due job.
    pub fn tick(&mut self, out: &mut Vec<Event>) {
        for (_, job) in self.scheduler.advance() {
            if job.runs_while(self.phase) {
                self.run_job(job, out);
            }
        }
    }

    /// Applies a command, pushing the resulting events into `out`.
    pub fn apply(&mut self, command: Command, out: &mut Vec<Event>) {
        match command {
            Command::StartEvent { center } => {
                let _ = self.start_event(center, out);
            }
            Command::StopEvent => {
                let _ = self.stop_event(out);
            }
            Command::ForceSpread => {
                let _ = self.force_spread(out);
            }
            Command::Cure { origin, trigger } => {
                let _ = self.cure(origin, trigger, out);
            }
            Command::ResetLedger => self.reset_ledger(out),
            Command::Tick => self.tick(out),
        }
    }

    /// Clears the cured ledger in memory and in the store.
    pub fn reset_ledger(&mut self, out: &mut Vec<Event>) {
        let cleared = self.state.ledger().len();
        self.state.ledger().clear();
        if let Err(error) = self.host.ledger_store().save(&[]) {
            error!(%error, "failed to clear persisted cured ledger");
        }
        info!(cleared, "cured ledger reset");
        out.push(Event::LedgerReset);
    }

    /// Persists the cured ledger; returns `false` when the store failed.
    pub fn save_ledger(&self) -> bool {
        save_ledger(&self.state, &self.host)
    }

    /// Drains a pending restoration synchronously and returns the cells restored.
    pub fn finish_now(&mut self, out: &mut Vec<Event>) -> usize {
        let Some(mut restoration) = self.restoration.take() else {
            return 0;
        };
        let _ = self.scheduler.cancel_all();
        self.phase = Phase::Idle;
        restoration.finish(&self.state, &self.host, out)
    }

    /// Reports whether a session is spreading.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Centre of the current or most recent session.
    #[must_use]
    pub const fn center(&self) -> Option<Position> {
        self.center
    }

    /// Number of active cells.
    #[must_use]
    pub fn active_cell_count(&self) -> usize {
        self.state.active().len()
    }

    /// Number of permanently cured positions.
    #[must_use]
    pub fn cured_count(&self) -> usize {
        self.state.ledger().len()
    }

    /// Number of queued frontier candidates.
    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.state.frontier().len()
    }

    /// Number of cells belonging to tendrils.
    #[must_use]
    pub fn tracked_structure_count(&self) -> usize {
        self.state.structures().len()
    }

    /// Effective corruption level including surges.
    #[must_use]
    pub fn level(&self) -> CorruptionLevel {
        self.levels.level()
    }

    /// Ticks advanced since the coordinator was created.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// Shared session collections.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Configuration the coordinator was created with.
    #[must_use]
    pub const fn config(&self) -> &BlightConfig {
        &self.config
    }

    /// Combined status snapshot.
    #[must_use]
    pub fn status(&self) -> EventStatus {
        EventStatus {
            phase: self.phase,
            center: self.center,
            active_cells: self.active_cell_count(),
            cured_positions: self.cured_count(),
            frontier: self.frontier_len(),
            tracked_structures: self.tracked_structure_count(),
            level: self.level(),
        }
    }

    fn active_center(&self) -> Option<Position> {
        match self.phase {
            Phase::Active => self.center,
            Phase::Idle | Phase::Restoring => None,
        }
    }

    fn run_job(&mut self, job: Job, out: &mut Vec<Event>) {
        match job {
            Job::Escalation => {
                let _ = self.levels.escalate(out);
                return;
            }
            Job::SurgeExpiry(surge) => {
                let _ = self.levels.end_surge(surge, out);
                return;
            }
            Job::Restoration => {
                self.advance_restoration(out);
                return;
            }
            Job::Propagation | Job::Detail | Job::Tendril | Job::Ambient => {}
        }

        let Some(center) = self.active_center() else {
            return;
        };
        let ctx = JobContext::new(
            &self.state,
            &self.host,
            center,
            self.config.max_radius,
            self.levels.level(),
        );
        match job {
            Job::Propagation => {
                let _ = self.propagation.run(&ctx, &mut self.rng, out);
            }
            Job::Detail => {
                let _ = self.detail.run(&ctx, &mut self.rng, out);
            }
            Job::Tendril => {
                let _ = self.tendrils.run(&ctx, &mut self.rng, out);
            }
            Job::Ambient => ambient::run(
                &self.config.ambient,
                &self.propagation,
                &ctx,
                &mut self.rng,
                out,
            ),
            Job::Escalation | Job::SurgeExpiry(_) | Job::Restoration => {}
        }
    }

    fn advance_restoration(&mut self, out: &mut Vec<Event>) {
        let Some(restoration) = self.restoration.as_mut() else {
            return;
        };
        if restoration.run_batch(&self.state, &self.host, out) {
            self.restoration = None;
            let _ = self.scheduler.cancel_all();
            self.phase = Phase::Idle;
        }
    }

    fn merge_persisted_ledger(&self) -> usize {
        match self.host.ledger_store().load() {
            Ok(positions) => {
                let merged = self.state.ledger().extend(positions);
                if merged > 0 {
                    info!(merged, total = self.state.ledger().len(), "loaded cured ledger");
                }
                merged
            }
            Err(error) => {
                warn!(%error, "failed to load cured ledger; continuing with the in-memory copy");
                0
            }
        }
    }
}

fn schedule(scheduler: &mut TickScheduler<Job>, job: Job, timing: JobCadence) -> JobHandle {
    scheduler.schedule_repeating(job, timing.delay, timing.period)
}
