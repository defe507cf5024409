#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line adapter for the Blight corruption engine.

mod ledger_file;
mod scene;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use blight_core::{BlightConfig, Event, Phase, Position, TriggerId};
use blight_system_lifecycle::Coordinator;
use blight_system_tendril::TemplateLibrary;
use blight_world::{query, EffectLog, HostBindings, LedgerStore};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::ledger_file::FileLedgerStore;

/// Upper bound on ticks spent draining a restoration.
const DRAIN_LIMIT: u64 = 1_000_000;

#[derive(Parser, Debug)]
#[command(name = "blight", version, about = "Run and inspect corruption events headlessly")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run a corruption event on a demo meadow, stop it and verify restoration.
    Simulate(SimulateArgs),
    /// Inspect or clear the persisted cured ledger.
    Ledger {
        /// Ledger file to operate on.
        #[arg(long, default_value = "blight-ledger.json")]
        ledger: PathBuf,
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    /// Print every cured position.
    Show,
    /// Remove every cured position.
    Reset,
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ledger file cured positions are persisted to.
    #[arg(long, default_value = "blight-ledger.json")]
    ledger: PathBuf,
    /// Extra template manifest (TOML, or JSON by extension).
    #[arg(long)]
    templates: Option<PathBuf>,
    /// Ticks to run before stopping the event.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Half extent of the demo meadow.
    #[arg(long, default_value_t = 24)]
    extent: i32,
    /// Overrides the configured maximum radius.
    #[arg(long)]
    radius: Option<f64>,
    /// Overrides the configured random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Cure around a random corrupted cell every N ticks.
    #[arg(long)]
    cure_every: Option<u64>,
    /// Force a spread on the given tick; repeatable.
    #[arg(long = "force-spread-at")]
    force_spread_at: Vec<u64>,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Outcome of a simulated event.
#[derive(Debug, Default, Serialize)]
struct Summary {
    ticks: u64,
    peak_active: usize,
    converted: usize,
    details: usize,
    tendrils: usize,
    cures: usize,
    cured_cells: usize,
    forced_spreads: usize,
    restored: usize,
    peak_level: u8,
    ledger_size: usize,
    effects: usize,
    reversible: bool,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CellCorrupted { .. } => self.converted += 1,
                Event::DetailPlaced { .. } => self.details += 1,
                Event::TendrilGrown { .. } => self.tendrils += 1,
                Event::AreaCured { reverted, .. } => {
                    self.cures += 1;
                    self.cured_cells += reverted;
                }
                Event::SurgeStarted { .. } => self.forced_spreads += 1,
                Event::RestorationCompleted { restored } => self.restored += restored,
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Simulate(args) => simulate(&args),
        CliCommand::Ledger { ledger, action } => run_ledger(&ledger, &action),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(radius) = args.radius {
        config.max_radius = radius;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let library = load_templates(args.templates.as_deref())?;

    let terrain = Arc::new(scene::meadow(args.extent));
    let before = terrain.snapshot();
    let effects = Arc::new(EffectLog::new());
    let host = HostBindings::new(terrain.clone())
        .with_effects(effects.clone())
        .with_ledger_store(Arc::new(FileLedgerStore::new(&args.ledger)));

    let mut cure_rng = ChaCha8Rng::seed_from_u64(config.seed.rotate_left(17));
    let mut coordinator = Coordinator::with_templates(config, host, library);
    let mut summary = Summary::default();
    let mut events = Vec::new();

    if !coordinator.start_event(Position::at(0, 0, 0), &mut events) {
        bail!("corruption event failed to start");
    }

    for tick in 1..=args.ticks {
        coordinator.tick(&mut events);
        if args.force_spread_at.contains(&tick) {
            let _ = coordinator.force_spread(&mut events);
        }
        if let Some(every) = args.cure_every.filter(|every| *every > 0) {
            if tick % every == 0 {
                if let Some(origin) = query::random_base_cell(coordinator.state(), &mut cure_rng) {
                    let _ = coordinator.cure(origin, Some(TriggerId::new(tick.into())), &mut events);
                }
            }
        }
        summary.peak_active = summary.peak_active.max(coordinator.active_cell_count());
        summary.peak_level = summary.peak_level.max(coordinator.level().get());
        summary.record(&events);
        events.clear();
    }
    summary.ticks = args.ticks;

    let _ = coordinator.stop_event(&mut events);
    let mut drained = 0;
    while coordinator.phase() != Phase::Idle {
        if drained == DRAIN_LIMIT {
            bail!("restoration did not finish within {DRAIN_LIMIT} ticks");
        }
        coordinator.tick(&mut events);
        drained += 1;
    }
    summary.record(&events);

    if !coordinator.save_ledger() {
        warn!(path = %args.ledger.display(), "cured ledger was not persisted");
    }
    summary.ledger_size = coordinator.cured_count();
    summary.effects = effects.effects().len();
    summary.reversible = terrain.snapshot() == before;
    info!(drained, restored = summary.restored, "restoration drained");

    print_summary(&summary, args.json)?;
    if !summary.reversible {
        bail!("terrain differs from its pre-event state after restoration");
    }
    Ok(())
}

fn run_ledger(path: &Path, action: &LedgerAction) -> Result<()> {
    let store = FileLedgerStore::new(path);
    match action {
        LedgerAction::Show => {
            let cured = store
                .load()
                .with_context(|| format!("failed to read ledger {}", store.path().display()))?;
            println!("{} cured positions in {}", cured.len(), store.path().display());
            for position in cured {
                println!("  {position}");
            }
        }
        LedgerAction::Reset => {
            store
                .save(&[])
                .with_context(|| format!("failed to reset ledger {}", store.path().display()))?;
            println!("cleared {}", store.path().display());
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BlightConfig> {
    let Some(path) = path else {
        return Ok(BlightConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config {}", path.display()))
}

fn load_templates(path: Option<&Path>) -> Result<TemplateLibrary> {
    let mut library = TemplateLibrary::builtin();
    let Some(path) = path else {
        return Ok(library);
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read templates {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let added = if is_json {
        library.extend_from_json(&contents)
    } else {
        library.extend_from_toml(&contents)
    }
    .with_context(|| format!("failed to load templates {}", path.display()))?;

    info!(added, total = library.len(), "loaded tendril templates");
    Ok(library)
}

fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(summary).context("failed to format summary JSON")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("ticks run:          {}", summary.ticks);
    println!("peak active cells:  {}", summary.peak_active);
    println!("cells converted:    {}", summary.converted);
    println!("features placed:    {}", summary.details);
    println!("tendrils grown:     {}", summary.tendrils);
    println!("forced spreads:     {}", summary.forced_spreads);
    println!(
        "cures:              {} ({} cells)",
        summary.cures, summary.cured_cells
    );
    println!("cells restored:     {}", summary.restored);
    println!("peak level:         {}", summary.peak_level);
    println!("ledger size:        {}", summary.ledger_size);
    println!("effects requested:  {}", summary.effects);
    println!(
        "reversible:         {}",
        if summary.reversible { "yes" } else { "no" }
    );
    Ok(())
}
