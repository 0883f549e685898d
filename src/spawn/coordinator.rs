//! Spawn resolution: the one entry point lifecycle hooks call.
//!
//! On [`Trigger::Join`] the first matching rule wins:
//!
//! 1. the participant has an explicit return point → leave it to the host
//! 2. the backup holds a record that differs from the primary store → apply it
//! 3. the primary store says the participant was already assigned → nothing to do
//! 4. search, escalate, and finally fall back to the sanitised shared spawn
//!
//! [`Trigger::Respawn`] uses rules 1 and 2, then the primary record, and otherwise
//! defers to the host. It never searches.

use crate::config::SpawnConfig;
use crate::logutil::{escape_log, spawn_trace};
use crate::spawn::backup::BackupStore;
use crate::spawn::host::{PlacementSink, WorldView};
use crate::spawn::primary::PrimaryStore;
use crate::spawn::search::{sample_column, search, OffsetSource, SearchOutcome};
use crate::spawn::types::{BlockPos, ParticipantContext, SpawnRecord, Trigger};

/// How a freshly assigned position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSource {
    Search { tries_used: u32, escalated: bool },
    /// Shared spawn point with only the height sample applied.
    Fallback,
}

/// Terminal result of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The participant's dimension is not enabled in config.
    Ignored,
    /// The host's own behaviour applies (explicit return point, or nothing stored on respawn).
    DeferredToHost,
    /// A backup record that disagreed with the primary store was applied.
    OverrideApplied(BlockPos),
    /// Join for a participant that already has an assignment; no effects.
    AlreadyAssigned,
    /// A new position was chosen and applied.
    Assigned { pos: BlockPos, source: AssignmentSource },
    /// Respawn sent the participant back to their stored position.
    Restored(BlockPos),
}

impl Resolution {
    /// Block position the participant was placed on, if any.
    pub fn placed_at(&self) -> Option<BlockPos> {
        match self {
            Resolution::OverrideApplied(pos) | Resolution::Restored(pos) => Some(*pos),
            Resolution::Assigned { pos, .. } => Some(*pos),
            Resolution::Ignored | Resolution::DeferredToHost | Resolution::AlreadyAssigned => None,
        }
    }
}

/// Owns both spawn stores for one world session.
pub struct SpawnCoordinator {
    config: SpawnConfig,
    primary: PrimaryStore,
    backup: BackupStore,
}

impl SpawnCoordinator {
    pub fn new(config: SpawnConfig, primary: PrimaryStore, backup: BackupStore) -> Self {
        Self {
            config: config.sanitized(),
            primary,
            backup,
        }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    pub fn primary(&self) -> &PrimaryStore {
        &self.primary
    }

    /// Mutable access for the host's save cycle (see `WorldSave::save_primary`).
    pub fn primary_mut(&mut self) -> &mut PrimaryStore {
        &mut self.primary
    }

    pub fn backup(&self) -> &BackupStore {
        &self.backup
    }

    pub fn into_parts(self) -> (PrimaryStore, BackupStore) {
        (self.primary, self.backup)
    }

    /// Resolve a lifecycle event to a terminal decision, applying any placement.
    pub fn resolve<H, S>(
        &mut self,
        host: &mut H,
        participant: &ParticipantContext,
        trigger: Trigger,
        rng: &mut S,
    ) -> Resolution
    where
        H: WorldView + PlacementSink,
        S: OffsetSource + ?Sized,
    {
        if !self.config.is_dimension_enabled(&participant.dimension) {
            return Resolution::Ignored;
        }
        if participant.has_explicit_return_point() {
            spawn_trace!(
                self.config.debug_logs,
                "{}: {} has an explicit return point; deferring to host",
                trigger_label(trigger),
                escape_log(&participant.display_name)
            );
            return Resolution::DeferredToHost;
        }
        match trigger {
            Trigger::Join => self.resolve_join(host, participant, rng),
            Trigger::Respawn => self.resolve_respawn(host, participant),
        }
    }

    fn resolve_join<H, S>(&mut self, host: &mut H, participant: &ParticipantContext, rng: &mut S) -> Resolution
    where
        H: WorldView + PlacementSink,
        S: OffsetSource + ?Sized,
    {
        let id = participant.id;
        let dimension = participant.dimension.as_str();

        if let Some(manual) = self.backup.load(id, &participant.display_name, dimension) {
            let differs = self
                .primary
                .get_in(id, dimension)
                .map(|stored| stored.pos() != manual.pos())
                .unwrap_or(true);
            if differs {
                let pos = manual.pos();
                self.apply(host, participant, pos, 0.0);
                log::info!(
                    "join: applied spawn override for {} at {}",
                    escape_log(&participant.display_name),
                    pos
                );
                return Resolution::OverrideApplied(pos);
            }
        }

        if self.primary.is_assigned(id, dimension) {
            spawn_trace!(self.config.debug_logs, "join: already assigned; skip");
            return Resolution::AlreadyAssigned;
        }

        let (pos, source) = self.find_spawn(&*host, participant, rng);
        self.apply(host, participant, pos, 0.0);
        log::info!(
            "join: assigned spawn for {} at {} ({:?})",
            escape_log(&participant.display_name),
            pos,
            source
        );
        Resolution::Assigned { pos, source }
    }

    fn resolve_respawn<H>(&mut self, host: &mut H, participant: &ParticipantContext) -> Resolution
    where
        H: WorldView + PlacementSink,
    {
        let id = participant.id;
        let dimension = participant.dimension.as_str();

        let stored = self.primary.get_in(id, dimension).map(SpawnRecord::pos);
        let manual = self
            .backup
            .load(id, &participant.display_name, dimension)
            .map(|record| record.pos());

        let resolution = match (manual, stored) {
            (Some(pos), stored) if stored != Some(pos) => Resolution::OverrideApplied(pos),
            (Some(pos), _) | (None, Some(pos)) => Resolution::Restored(pos),
            (None, None) => {
                spawn_trace!(self.config.debug_logs, "respawn: nothing stored; deferring to host");
                return Resolution::DeferredToHost;
            }
        };
        if let Some(pos) = resolution.placed_at() {
            self.apply(host, participant, pos, participant.yaw);
            spawn_trace!(
                self.config.debug_logs,
                "respawn: {} sent to {}",
                escape_log(&participant.display_name),
                pos
            );
        }
        resolution
    }

    /// Search, escalate once, then fall back. Always yields a position.
    fn find_spawn<W, S>(&self, world: &W, participant: &ParticipantContext, rng: &mut S) -> (BlockPos, AssignmentSource)
    where
        W: WorldView + ?Sized,
        S: OffsetSource + ?Sized,
    {
        let center = world.shared_spawn();
        let passes = [
            (self.config.max_tries, false),
            (self.config.escalated_tries(), true),
        ];
        for (tries, escalated) in passes {
            match search(world, center, &self.config, rng, tries, participant.id) {
                SearchOutcome::Found { pos, tries_used } => {
                    return (pos, AssignmentSource::Search { tries_used, escalated });
                }
                SearchOutcome::NotFound { tries } => {
                    spawn_trace!(self.config.debug_logs, "search exhausted after {} tries", tries);
                }
            }
        }

        // Only the height sample is applied here; the safety predicates are not.
        let fallback = sample_column(world, center.x, center.z);
        log::warn!(
            "no safe spawn found for {} after escalation; using shared spawn {}",
            escape_log(&participant.display_name),
            fallback
        );
        (fallback, AssignmentSource::Fallback)
    }

    /// Place the participant, register the return point, and write both stores.
    fn apply<H>(&mut self, host: &mut H, participant: &ParticipantContext, pos: BlockPos, yaw: f32)
    where
        H: PlacementSink + ?Sized,
    {
        host.set_default_return_point(participant.id, &participant.dimension, pos);
        host.place(participant.id, pos.standing_point(), yaw);

        let record = SpawnRecord::assigned(pos, participant.dimension.clone(), participant.display_name.trim());
        if self.primary.get(participant.id) != Some(&record) {
            self.primary.put(participant.id, record.clone());
        }
        if let Err(e) = self.backup.save(participant.id, &participant.display_name, &record) {
            log::error!(
                "failed to write spawn backup for {}: {}",
                escape_log(&participant.display_name),
                e
            );
        }
    }
}

fn trigger_label(trigger: Trigger) -> &'static str {
    match trigger {
        Trigger::Join => "join",
        Trigger::Respawn => "respawn",
    }
}
