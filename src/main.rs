//! Binary entrypoint for the Spawnkeeper CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `simulate [--participants <n>] [--seed <s>] [--radius <r>]` - run joins against a
//!   generated in-memory world using the configured stores, then a second round of joins
//!   that should all be no-ops
//!
//! See the library crate docs for module-level details: `spawnkeeper::`.
use std::collections::HashMap;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spawnkeeper::config::Config;
use spawnkeeper::spawn::{
    AssignmentSource, BackupStore, ParticipantContext, ParticipantId, Resolution, SimWorld,
    SpawnCoordinator, Trigger, WorldSave,
};

#[derive(Parser)]
#[command(name = "spawnkeeper")]
#[command(about = "Persistent random first spawns for shared voxel worlds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Resolve joins for synthetic participants in a generated world
    Simulate {
        /// Number of participants to join
        #[arg(short, long, default_value_t = 16)]
        participants: u32,
        /// Seed for terrain and candidate selection
        #[arg(short, long, default_value_t = 1)]
        seed: u64,
        /// Half-width of the generated terrain features area, in blocks
        #[arg(short, long, default_value_t = 2000)]
        radius: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Simulate {
            participants,
            seed,
            radius,
        } => {
            let config = match Config::load(&cli.config).await {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{} (using defaults)", e);
                    Config::default()
                }
            };
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Spawnkeeper simulation v{}", env!("CARGO_PKG_VERSION"));
            simulate(&config, participants, seed, radius)?;
        }
    }

    Ok(())
}

fn simulate(config: &Config, participants: u32, seed: u64, radius: i32) -> Result<()> {
    let dimension = config
        .spawn
        .enabled_dimensions
        .first()
        .cloned()
        .unwrap_or_else(|| "minecraft:overworld".to_string());

    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = SimWorld::generated(dimension.clone(), &mut rng, radius);

    let save = WorldSave::open(config.storage.world_db_path())?;
    let backup = BackupStore::new(
        config.storage.backup_path(),
        config.storage.legacy_backup_path(),
    );
    let mut coordinator = SpawnCoordinator::new(config.spawn.clone(), save.load_primary()?, backup);

    let roster: Vec<ParticipantContext> = (0..participants)
        .map(|n| {
            let mut bytes = [0u8; 16];
            rng.fill(&mut bytes);
            let id = ParticipantId(uuid::Builder::from_random_bytes(bytes).into_uuid());
            ParticipantContext::new(id, format!("player{:03}", n), dimension.clone())
        })
        .collect();

    let mut tally: HashMap<&'static str, u32> = HashMap::new();
    for participant in &roster {
        let outcome = coordinator.resolve(&mut world, participant, Trigger::Join, &mut rng);
        *tally.entry(label(&outcome)).or_default() += 1;
    }

    let mutations_before = coordinator.primary().mutation_count();
    let backup_writes_before = coordinator.backup().write_count();
    for participant in &roster {
        let outcome = coordinator.resolve(&mut world, participant, Trigger::Join, &mut rng);
        if outcome != Resolution::AlreadyAssigned {
            warn!("second join for {} was not a no-op: {:?}", participant.display_name, outcome);
        }
    }
    if coordinator.primary().mutation_count() != mutations_before
        || coordinator.backup().write_count() != backup_writes_before
    {
        warn!("second join round mutated the spawn stores");
    }

    let written = save.save_primary(coordinator.primary_mut())?;
    let mut summary: Vec<_> = tally.into_iter().collect();
    summary.sort();
    for (kind, count) in summary {
        info!("{:>10}: {}", kind, count);
    }
    info!(
        "{} placements, {} records flushed to {:?}, backup at {:?}",
        world.placements().len(),
        written,
        config.storage.world_db_path(),
        coordinator.backup().current_path()
    );
    Ok(())
}

fn label(outcome: &Resolution) -> &'static str {
    match outcome {
        Resolution::Ignored => "ignored",
        Resolution::DeferredToHost => "deferred",
        Resolution::OverrideApplied(_) => "override",
        Resolution::AlreadyAssigned => "assigned",
        Resolution::Assigned {
            source: AssignmentSource::Search { escalated: false, .. },
            ..
        } => "searched",
        Resolution::Assigned {
            source: AssignmentSource::Search { escalated: true, .. },
            ..
        } => "escalated",
        Resolution::Assigned {
            source: AssignmentSource::Fallback,
            ..
        } => "fallback",
        Resolution::Restored(_) => "restored",
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
