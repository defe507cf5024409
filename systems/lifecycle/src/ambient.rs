use blight_core::{AmbientTuning, EffectKind, Event};
use blight_system_propagation::Propagation;
use blight_world::{query, JobContext};
use rand::Rng;
use tracing::debug;

/// Emits background effects and occasionally pulses the frontier.
pub(crate) fn run<R>(
    tuning: &AmbientTuning,
    propagation: &Propagation,
    ctx: &JobContext<'_>,
    rng: &mut R,
    out: &mut Vec<Event>,
) where
    R: Rng + ?Sized,
{
    let state = ctx.state();
    let effects = ctx.host().effects();

    for position in query::sample_active_cells(state, rng, tuning.effect_samples) {
        effects.emit_effect(position, EffectKind::Ambient);
    }

    if rng.gen::<f64>() < tuning.sound_chance {
        if let Some(position) = query::random_base_cell(state, rng) {
            effects.emit_effect(position, EffectKind::AmbientSound);
        }
    }

    if state.active().len() >= tuning.pulse_min_active && rng.gen::<f64>() < tuning.pulse_chance {
        let queued = propagation.reseed_from_base(ctx);
        effects.emit_effect(ctx.center(), EffectKind::Pulse);
        debug!(queued, "corruption pulse");
        out.push(Event::CorruptionPulse { queued });
    }
}
