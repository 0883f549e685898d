//! First-spawn assignment and reconciliation.
//!
//! The search half ([`search`]) finds a safe random column near the shared spawn point.
//! The persistence half keeps each participant's assignment in two places: the
//! world-scoped [`PrimaryStore`] and the external [`BackupStore`] file. The
//! [`SpawnCoordinator`] decides between them on every join or respawn.

pub mod backup;
pub mod coordinator;
pub mod errors;
pub mod host;
pub mod primary;
pub mod search;
pub mod sim;
pub mod types;

pub use backup::{BackupFile, BackupStore};
pub use coordinator::{AssignmentSource, Resolution, SpawnCoordinator};
pub use errors::SpawnError;
pub use host::{BiomeTag, PlacementSink, PresentParticipant, WorldView};
pub use primary::{PrimaryStore, WorldSave};
pub use search::{check_candidate, search, OffsetSource, Rejection, SearchOutcome};
pub use sim::{Column, Placement, SimWorld};
pub use types::*;
