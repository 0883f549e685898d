use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Integer block coordinate inside one dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn above(self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    pub const fn below(self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }

    /// Chunk column containing this block (16x16 columns).
    pub const fn chunk(self) -> (i32, i32) {
        (self.x >> 4, self.z >> 4)
    }

    /// Where an entity stands when placed on top of this block position.
    pub fn standing_point(self) -> EntityPos {
        EntityPos {
            x: f64::from(self.x) + 0.5,
            y: f64::from(self.y) + 1.0,
            z: f64::from(self.z) + 0.5,
        }
    }

    pub fn distance_to(self, other: EntityPos) -> f64 {
        let dx = f64::from(self.x) - other.x;
        let dy = f64::from(self.y) - other.y;
        let dz = f64::from(self.z) - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={} y={} z={}", self.x, self.y, self.z)
    }
}

/// Continuous entity position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EntityPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EntityPos {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Opaque stable participant identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persisted spawn assignment. Stores key records by participant id, so the id itself is
/// not part of the record body.
///
/// Field names match the on-disk backup schema (`x`, `y`, `z`, `dimension`, `name`).
/// `assigned` is absent from older backup files and defaults to `true` there, since an
/// entry only ever reached the backup after a successful placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpawnRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub dimension: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_assigned")]
    pub assigned: bool,
}

fn default_assigned() -> bool {
    true
}

impl SpawnRecord {
    pub fn assigned(pos: BlockPos, dimension: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            dimension: dimension.into(),
            name: name.into(),
            assigned: true,
        }
    }

    pub fn pos(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    /// Records only have meaning inside the dimension that produced them.
    pub fn is_in(&self, dimension: &str) -> bool {
        self.dimension == dimension
    }
}

/// A return point the host is tracking for a participant (bed, anchor, or one we set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnPoint {
    pub dimension: String,
    pub pos: BlockPos,
    /// Forced return points are the ones this crate registers; they never pre-empt us.
    pub forced: bool,
    /// Whether the location is loaded and still backed by a bed-like block.
    pub backed_by_block: bool,
}

impl ReturnPoint {
    /// Explicit return points defer resolution entirely to the host.
    pub fn is_explicit(&self) -> bool {
        !self.forced && self.backed_by_block
    }
}

/// Lifecycle event that triggered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Participant joined (or is about to be placed into) the world.
    Join,
    /// Participant needs a destination after death or an invalidated return point.
    Respawn,
}

/// Everything a lifecycle hook hands to the coordinator about one participant.
#[derive(Debug, Clone)]
pub struct ParticipantContext {
    pub id: ParticipantId,
    pub display_name: String,
    pub dimension: String,
    pub return_point: Option<ReturnPoint>,
    /// Current facing; respawn placement keeps it.
    pub yaw: f32,
}

impl ParticipantContext {
    pub fn new(id: ParticipantId, display_name: impl Into<String>, dimension: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            dimension: dimension.into(),
            return_point: None,
            yaw: 0.0,
        }
    }

    pub fn with_return_point(mut self, return_point: Option<ReturnPoint>) -> Self {
        self.return_point = return_point;
        self
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    pub fn has_explicit_return_point(&self) -> bool {
        self.return_point
            .as_ref()
            .map(ReturnPoint::is_explicit)
            .unwrap_or(false)
    }
}
