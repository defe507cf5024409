use std::sync::Arc;

use blight_core::{
    CorruptionLevel, EffectKind, Event, Material, Position, SpreadWeights, TendrilStrategy,
    TendrilTuning,
};
use blight_system_tendril::{Template, TemplateCell, TemplateLibrary, TendrilPlacer};
use blight_world::{
    Claim, EffectLog, GridTerrain, HostBindings, JobContext, SessionState, Terrain, TerrainError,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const RADIUS: f64 = 100.0;

fn corrupted_floor(host: &HostBindings, state: &SessionState, terrain: &GridTerrain, half: i32) {
    terrain.fill(
        Position::at(-half, 0, -half),
        Position::at(half, 0, half),
        Material::Dirt,
    );
    let ctx = JobContext::new(state, host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    for x in -half..=half {
        for z in -half..=half {
            assert_eq!(
                ctx.claim(Position::at(x, 0, z), Material::Dirt, Material::Blight),
                Claim::Written
            );
        }
    }
}

fn spire() -> TemplateLibrary {
    let mut library = TemplateLibrary::empty();
    library
        .insert(
            Template::new(
                "spire",
                vec![
                    TemplateCell::new(0, 1, 0, Material::Blight),
                    TemplateCell::new(0, 2, 0, Material::BlightAlarm),
                ],
            )
            .expect("spire is valid"),
        )
        .expect("spire is unique");
    library
}

fn grown(events: &[Event]) -> Vec<(Position, usize, TendrilStrategy)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::TendrilGrown {
                anchor,
                cells,
                strategy,
            } => Some((*anchor, *cells, *strategy)),
            _ => None,
        })
        .collect()
}

#[test]
fn templates_are_recorded_and_tracked() {
    let terrain = Arc::new(GridTerrain::new());
    let effects = Arc::new(EffectLog::new());
    let host = HostBindings::new(terrain.clone()).with_effects(effects.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain, 3);

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    let placer = TendrilPlacer::new(
        TendrilTuning::default(),
        TemplateLibrary::builtin(),
        SpreadWeights::builtin(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut events = Vec::new();
    let anchor = Position::at(0, 0, 0);

    let cells = placer.grow(&ctx, &mut rng, anchor, &mut events);

    assert!(cells > 0);
    assert_eq!(grown(&events), vec![(anchor, cells, TendrilStrategy::Template)]);
    assert_eq!(state.structures().len(), cells);
    for (position, record) in state.active().snapshot() {
        if position.y() == 0 {
            continue;
        }
        assert!(state.structures().contains(position));
        assert_eq!(record.original(), Material::Air);
        assert_eq!(terrain.peek(position), record.placed());
    }
    let eruptions: Vec<Position> = effects
        .effects()
        .into_iter()
        .filter(|(_, effect)| *effect == EffectKind::TendrilEruption(TendrilStrategy::Template))
        .map(|(position, _)| position)
        .collect();
    assert_eq!(eruptions, vec![anchor]);
}

#[test]
fn an_empty_library_grows_procedurally() {
    let terrain = Arc::new(GridTerrain::new());
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain, 2);

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    let placer = TendrilPlacer::new(
        TendrilTuning::default(),
        TemplateLibrary::empty(),
        SpreadWeights::builtin(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut events = Vec::new();

    let cells = placer.grow(&ctx, &mut rng, Position::at(0, 0, 0), &mut events);

    assert!(cells >= 8);
    let grown = grown(&events);
    assert_eq!(grown.len(), 1);
    assert_eq!(grown[0].2, TendrilStrategy::Procedural);
    assert_eq!(state.structures().len(), cells);
}

#[test]
fn cured_cells_are_never_stamped() {
    let terrain = Arc::new(GridTerrain::new());
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain, 2);
    let cured: Vec<Position> = (1..=20).map(|y| Position::at(0, y, 0)).collect();
    let _ = state.ledger().extend(cured.iter().copied());

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    let placer = TendrilPlacer::new(
        TendrilTuning::default(),
        TemplateLibrary::builtin(),
        SpreadWeights::builtin(),
    );
    assert!(!placer.has_clearance(&ctx, Position::at(0, 0, 0)));

    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut events = Vec::new();
    let _ = placer.grow(&ctx, &mut rng, Position::at(0, 0, 0), &mut events);

    for position in cured {
        assert!(!state.active().contains(position));
        assert!(!state.structures().contains(position));
        assert_eq!(terrain.peek(position), Material::Air);
    }
}

#[test]
fn active_cells_keep_their_original_and_stay_untracked() {
    let terrain = Arc::new(GridTerrain::new());
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain, 1);

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    let existing = Position::at(0, 1, 0);
    assert_eq!(
        ctx.claim(existing, Material::OakLeaves, Material::BlightVein),
        Claim::Written
    );

    let placer = TendrilPlacer::new(TendrilTuning::default(), spire(), SpreadWeights::builtin());
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut events = Vec::new();

    assert_eq!(placer.grow(&ctx, &mut rng, Position::at(0, 0, 0), &mut events), 1);
    let record = state.active().get(existing).expect("still active");
    assert_eq!(record.original(), Material::OakLeaves);
    assert_eq!(terrain.peek(existing), Material::BlightVein);
    assert!(!state.structures().contains(existing));
    assert_eq!(terrain.peek(Position::at(0, 2, 0)), Material::BlightAlarm);
    assert!(state.structures().contains(Position::at(0, 2, 0)));
    assert_eq!(state.structures().len(), 1);
}

struct RefusesAlarms(GridTerrain);

impl Terrain for RefusesAlarms {
    fn material(&self, position: Position) -> Result<Material, TerrainError> {
        self.0.material(position)
    }

    fn set_material(&self, position: Position, material: Material) -> Result<(), TerrainError> {
        if material == Material::BlightAlarm {
            return Err(TerrainError::WriteRejected { position, material });
        }
        self.0.set_material(position, material)
    }
}

#[test]
fn failed_template_writes_fall_back_to_procedural_growth() {
    let terrain = Arc::new(RefusesAlarms(GridTerrain::new()));
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain.0, 1);

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    let placer = TendrilPlacer::new(TendrilTuning::default(), spire(), SpreadWeights::builtin());
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut events = Vec::new();

    let cells = placer.grow(&ctx, &mut rng, Position::at(0, 0, 0), &mut events);

    assert!(cells > 0);
    let grown = grown(&events);
    assert_eq!(grown.len(), 1);
    assert_eq!(grown[0].2, TendrilStrategy::Procedural);
    for (position, record) in state.active().snapshot() {
        assert_ne!(record.placed(), Material::BlightAlarm);
        assert_eq!(terrain.0.peek(position), record.placed());
    }
}

#[test]
fn runs_wait_for_enough_activity() {
    let terrain = Arc::new(GridTerrain::new());
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain, 1);

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MAX);
    let placer = TendrilPlacer::new(
        TendrilTuning {
            chance_base: 1.0,
            ..TendrilTuning::default()
        },
        TemplateLibrary::builtin(),
        SpreadWeights::builtin(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut events = Vec::new();

    for _ in 0..10 {
        assert_eq!(placer.run(&ctx, &mut rng, &mut events), 0);
    }
    assert!(events.is_empty());
}

#[test]
fn certain_spawns_erupt_from_a_base_cell() {
    let terrain = Arc::new(GridTerrain::new());
    let host = HostBindings::new(terrain.clone());
    let state = SessionState::new();
    corrupted_floor(&host, &state, &terrain, 2);

    let ctx = JobContext::new(&state, &host, Position::at(0, 0, 0), RADIUS, CorruptionLevel::MIN);
    let placer = TendrilPlacer::new(
        TendrilTuning {
            chance_base: 1.0,
            ..TendrilTuning::default()
        },
        TemplateLibrary::builtin(),
        SpreadWeights::builtin(),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let mut events = Vec::new();

    assert!(placer.run(&ctx, &mut rng, &mut events) > 0);
    let grown = grown(&events);
    assert_eq!(grown.len(), 1);
    assert_eq!(grown[0].0.y(), 0);
}
