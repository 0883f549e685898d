//! Capability surface between the spawn core and the hosting game server.
//!
//! The coordinator never sees the host's full entity or level types. A host adapter
//! implements [`WorldView`] for terrain and presence queries and [`PlacementSink`] for the
//! two effects the core produces. Both are scoped to the dimension the participant is in.

use serde::{Deserialize, Serialize};

use crate::spawn::types::{BlockPos, EntityPos, ParticipantId};

/// Biome classifications the safety validator cares about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BiomeTag {
    Ocean,
    River,
}

/// Another participant currently present in the same dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentParticipant {
    pub id: ParticipantId,
    pub pos: EntityPos,
}

/// Read-only terrain and presence queries for one dimension.
pub trait WorldView {
    /// Whether `pos` lies inside the world's vertical and horizontal limits.
    fn in_world_bounds(&self, pos: BlockPos) -> bool;

    fn min_build_height(&self) -> i32;

    /// Load or generate the chunk column. May block while terrain is generated.
    fn ensure_chunk(&self, chunk_x: i32, chunk_z: i32);

    /// Topmost solid, non-foliage surface height: the y of the first free block above it.
    fn surface_height(&self, x: i32, z: i32) -> i32;

    fn biome_has_tag(&self, pos: BlockPos, tag: BiomeTag) -> bool;

    fn has_water(&self, pos: BlockPos) -> bool;

    /// Whether the block at `pos` presents a sturdy upward-facing surface.
    fn is_sturdy_top(&self, pos: BlockPos) -> bool;

    /// Whether the block volume at `pos` has no collision geometry.
    fn is_collision_free(&self, pos: BlockPos) -> bool;

    fn present_participants(&self) -> Vec<PresentParticipant>;

    /// The world's shared/default spawn point.
    fn shared_spawn(&self) -> BlockPos;
}

/// Effects the coordinator asks the host to perform.
pub trait PlacementSink {
    /// Move the participant's entity to `target`, facing `yaw`.
    fn place(&mut self, participant: ParticipantId, target: EntityPos, yaw: f32);

    /// Register `pos` as the participant's forced default return point in `dimension`.
    fn set_default_return_point(&mut self, participant: ParticipantId, dimension: &str, pos: BlockPos);
}
