//! # Spawnkeeper - Persistent random first spawns for shared voxel worlds
//!
//! Spawnkeeper gives every new participant of a shared world a safe, random starting
//! location, then keeps that location stable across restarts and store resets.
//!
//! ## Features
//!
//! - **Safe search**: bounded random search with biome, fluid, ground, headroom, flatness
//!   and isolation checks, escalating once before falling back to the shared spawn.
//! - **Dual persistence**: a world-scoped sled store plus a JSON backup file that survives
//!   world resets and supports lookup by display name.
//! - **Operator overrides**: editing the backup file moves a participant on next join.
//! - **Host agnostic**: the game server plugs in through the [`spawn::WorldView`] and
//!   [`spawn::PlacementSink`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use spawnkeeper::config::Config;
//! use spawnkeeper::spawn::{
//!     BackupStore, ParticipantContext, ParticipantId, SimWorld, SpawnCoordinator, Trigger, WorldSave,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let save = WorldSave::open(config.storage.world_db_path())?;
//!     let backup = BackupStore::new(config.storage.backup_path(), config.storage.legacy_backup_path());
//!     let mut coordinator = SpawnCoordinator::new(config.spawn.clone(), save.load_primary()?, backup);
//!
//!     let mut world = SimWorld::new("minecraft:overworld");
//!     let who = ParticipantContext::new(ParticipantId::new_v4(), "Alex", "minecraft:overworld");
//!     let outcome = coordinator.resolve(&mut world, &who, Trigger::Join, &mut StdRng::from_entropy());
//!     println!("{:?}", outcome);
//!
//!     save.save_primary(coordinator.primary_mut())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`spawn`] - search, stores, and the resolution coordinator
//! - [`config`] - configuration loading and bounds
//! - [`logutil`] - log sanitising and search tracing

pub mod config;
pub mod logutil;
pub mod spawn;
