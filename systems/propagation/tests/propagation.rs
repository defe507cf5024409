use std::sync::Arc;

use blight_core::{CorruptionLevel, Material, Position, PropagationTuning};
use blight_system_propagation::Propagation;
use blight_world::{
    GridTerrain, HostBindings, JobContext, SessionState, Terrain, TerrainError,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn run_until<F>(
    engine: &Propagation,
    ctx: &JobContext<'_>,
    rng: &mut ChaCha8Rng,
    max_runs: usize,
    mut done: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let mut events = Vec::new();
    for _ in 0..max_runs {
        let _ = engine.run(ctx, rng, &mut events);
        if done() {
            return true;
        }
    }
    false
}

#[test]
fn single_spreadable_neighbour_is_eventually_converted() {
    let neighbour = Position::at(1, 0, 0);
    let terrain = Arc::new(GridTerrain::with_cells([(neighbour, Material::Dirt)]));
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), 10.0, CorruptionLevel::MIN);
    let engine = Propagation::new(PropagationTuning::default());
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    assert_eq!(engine.seed(&ctx, &mut rng), 1);
    assert!(run_until(&engine, &ctx, &mut rng, 500, || state
        .active()
        .contains(neighbour)));

    let record = state.active().get(neighbour).expect("neighbour is active");
    assert_eq!(record.original(), Material::Dirt);
    assert_eq!(terrain.peek(neighbour), Material::Blight);
    assert_eq!(state.active().len(), 1);
}

#[test]
fn growth_never_leaves_the_radius() {
    let terrain = Arc::new(GridTerrain::new());
    terrain.fill(
        Position::at(-20, -1, -20),
        Position::at(20, 0, 20),
        Material::GrassBlock,
    );
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    let center = Position::at(0, 0, 0);
    let ctx = JobContext::new(&state, &host, center, 6.0, CorruptionLevel::new(3));
    let engine = Propagation::new(PropagationTuning::default());
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    let _ = engine.seed(&ctx, &mut rng);
    let _ = run_until(&engine, &ctx, &mut rng, 400, || false);

    assert!(!state.active().is_empty());
    for position in state.active().positions() {
        let distance = position.distance_to(center).expect("same region");
        assert!(distance <= 6.0, "{position} lies {distance} from the centre");
    }
    assert_eq!(terrain.count(Material::Blight), state.active().len());
}

#[test]
fn cured_positions_are_never_converted() {
    let terrain = Arc::new(GridTerrain::new());
    terrain.fill(Position::at(-8, 0, -8), Position::at(8, 0, 8), Material::Dirt);
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    let cured: Vec<Position> = (-8..=8).map(|x| Position::at(x, 0, 2)).collect();
    let _ = state.ledger().extend(cured.iter().copied());
    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), 12.0, CorruptionLevel::MAX);
    let engine = Propagation::new(PropagationTuning::default());
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let _ = engine.seed(&ctx, &mut rng);
    let _ = run_until(&engine, &ctx, &mut rng, 300, || false);

    assert!(state.active().len() > 10);
    for position in cured {
        assert!(!state.active().contains(position));
        assert_eq!(terrain.peek(position), Material::Dirt);
    }
}

#[test]
fn unspreadable_terrain_is_never_queued() {
    let terrain = Arc::new(GridTerrain::new());
    terrain.fill(Position::at(-5, -2, -5), Position::at(5, 4, 5), Material::Bedrock);
    let host = HostBindings::new(terrain);
    let state = SessionState::new();
    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), 50.0, CorruptionLevel::MIN);
    let engine = Propagation::new(PropagationTuning::default());

    assert_eq!(engine.enqueue_neighbors(&ctx, Position::at(0, 0, 0)), 0);
    assert!(state.frontier().is_empty());
}

#[test]
fn refill_reseeds_around_the_centre_when_nothing_converted() {
    let terrain = Arc::new(GridTerrain::with_cells([(Position::at(0, 1, 0), Material::Mud)]));
    let host = HostBindings::new(terrain);
    let state = SessionState::new();
    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), 10.0, CorruptionLevel::MIN);
    let engine = Propagation::new(PropagationTuning::default());
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut events = Vec::new();

    assert_eq!(engine.refill(&ctx, &mut rng, &mut events), 1);
    assert!(state.frontier().contains(Position::at(0, 1, 0)));
    assert_eq!(events.len(), 1);
}

/// Terrain that cures every cell the moment the engine writes corruption into it.
struct CuringTerrain {
    inner: GridTerrain,
    state: Arc<SessionState>,
}

impl Terrain for CuringTerrain {
    fn material(&self, position: Position) -> Result<Material, TerrainError> {
        self.inner.material(position)
    }

    fn set_material(&self, position: Position, material: Material) -> Result<(), TerrainError> {
        if material == Material::Blight {
            let _ = self.state.ledger().insert(position);
        }
        self.inner.set_material(position, material)
    }
}

#[test]
fn cure_landing_during_conversion_wins() {
    let state = Arc::new(SessionState::new());
    let target = Position::at(1, 0, 0);
    let terrain = Arc::new(CuringTerrain {
        inner: GridTerrain::with_cells([(target, Material::MossBlock)]),
        state: Arc::clone(&state),
    });
    let host = HostBindings::new(terrain.clone());
    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), 10.0, CorruptionLevel::MAX);
    let engine = Propagation::new(PropagationTuning::default());
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let _ = engine.seed(&ctx, &mut rng);
    let _ = run_until(&engine, &ctx, &mut rng, 200, || state.ledger().contains(target));

    assert!(state.ledger().contains(target));
    assert!(!state.active().contains(target));
    assert_eq!(terrain.inner.peek(target), Material::MossBlock);
}
