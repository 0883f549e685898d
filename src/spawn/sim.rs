//! In-memory host used by tests and the `simulate` command.
//!
//! Terrain is a base [`Column`] overlaid by rectangular regions (later regions win) and
//! then by single-column overrides. The world records every placement and return point
//! the coordinator asks for, so callers can assert on effects.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::spawn::host::{BiomeTag, PlacementSink, PresentParticipant, WorldView};
use crate::spawn::types::{BlockPos, EntityPos, ParticipantId, ReturnPoint};

/// One terrain column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Surface height: y of the first free block above the ground.
    pub height: i32,
    pub biome: Option<BiomeTag>,
    /// Water fills the block at the surface height.
    pub water: bool,
    pub sturdy_ground: bool,
    /// Free blocks above the surface before something solid (leaves, overhang).
    pub headroom: u8,
}

impl Column {
    pub const fn land(height: i32) -> Self {
        Self {
            height,
            biome: None,
            water: false,
            sturdy_ground: true,
            headroom: u8::MAX,
        }
    }

    pub const fn ocean(floor: i32) -> Self {
        Self {
            height: floor,
            biome: Some(BiomeTag::Ocean),
            water: true,
            sturdy_ground: true,
            headroom: u8::MAX,
        }
    }

    pub const fn river(height: i32) -> Self {
        Self {
            biome: Some(BiomeTag::River),
            ..Self::land(height)
        }
    }

    pub fn with_water(mut self) -> Self {
        self.water = true;
        self
    }

    pub fn with_soft_ground(mut self) -> Self {
        self.sturdy_ground = false;
        self
    }

    pub fn with_headroom(mut self, headroom: u8) -> Self {
        self.headroom = headroom;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    min_x: i32,
    min_z: i32,
    max_x: i32,
    max_z: i32,
    column: Column,
}

impl Region {
    fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Placement the coordinator requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub participant: ParticipantId,
    pub target: EntityPos,
    pub yaw: f32,
}

#[derive(Debug, Clone)]
pub struct SimWorld {
    dimension: String,
    base: Column,
    regions: Vec<Region>,
    columns: HashMap<(i32, i32), Column>,
    shared_spawn: (i32, i32),
    horizontal_limit: i32,
    participants: Vec<PresentParticipant>,
    loaded_chunks: RefCell<HashSet<(i32, i32)>>,
    height_samples: Cell<u64>,
    placements: Vec<Placement>,
    return_points: HashMap<ParticipantId, ReturnPoint>,
}

impl SimWorld {
    pub const MIN_BUILD_HEIGHT: i32 = -64;
    pub const MAX_BUILD_HEIGHT: i32 = 320;
    pub const DEFAULT_SURFACE: i32 = 64;

    /// Flat dry grassland at y=64 everywhere, shared spawn at the origin.
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            base: Column::land(Self::DEFAULT_SURFACE),
            regions: Vec::new(),
            columns: HashMap::new(),
            shared_spawn: (0, 0),
            horizontal_limit: 29_999_984,
            participants: Vec::new(),
            loaded_chunks: RefCell::new(HashSet::new()),
            height_samples: Cell::new(0),
            placements: Vec::new(),
            return_points: HashMap::new(),
        }
    }

    /// Seeded rough terrain: lakes, rivers, cliffs, hills and ocean patches over a
    /// land base. Plenty of columns still pass every predicate.
    pub fn generated<R: Rng>(dimension: impl Into<String>, rng: &mut R, radius: i32) -> Self {
        let radius = radius.max(1);
        let mut world = Self::new(dimension).with_base(Column::land(rng.gen_range(60..=80)));
        let features = rng.gen_range(20..60);
        for _ in 0..features {
            let cx = rng.gen_range(-radius..=radius);
            let cz = rng.gen_range(-radius..=radius);
            let half_w = rng.gen_range(2..=radius / 4 + 2);
            let half_d = rng.gen_range(2..=radius / 4 + 2);
            let surface = world.base.height;
            let column = match rng.gen_range(0..6) {
                0 => Column::ocean(surface - rng.gen_range(4..20)),
                1 => Column::river(surface - 2).with_water(),
                2 => Column::land(surface).with_water(),
                3 => Column::land(surface + rng.gen_range(5..40)),
                4 => Column::land(surface + rng.gen_range(-3..=3)).with_headroom(rng.gen_range(0..2)),
                _ => Column::land(surface + rng.gen_range(-2..=2)).with_soft_ground(),
            };
            world = world.with_region(cx - half_w, cz - half_d, cx + half_w, cz + half_d, column);
        }
        world
    }

    pub fn with_base(mut self, base: Column) -> Self {
        self.base = base;
        self
    }

    /// Overlay `column` on every block column in the inclusive rectangle.
    pub fn with_region(mut self, min_x: i32, min_z: i32, max_x: i32, max_z: i32, column: Column) -> Self {
        self.regions.push(Region {
            min_x,
            min_z,
            max_x,
            max_z,
            column,
        });
        self
    }

    pub fn with_column(mut self, x: i32, z: i32, column: Column) -> Self {
        self.columns.insert((x, z), column);
        self
    }

    pub fn with_shared_spawn(mut self, x: i32, z: i32) -> Self {
        self.shared_spawn = (x, z);
        self
    }

    pub fn with_participant(mut self, id: ParticipantId, pos: EntityPos) -> Self {
        self.add_participant(id, pos);
        self
    }

    pub fn add_participant(&mut self, id: ParticipantId, pos: EntityPos) {
        self.participants.retain(|p| p.id != id);
        self.participants.push(PresentParticipant { id, pos });
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn column(&self, x: i32, z: i32) -> Column {
        if let Some(column) = self.columns.get(&(x, z)) {
            return *column;
        }
        self.regions
            .iter()
            .rev()
            .find(|r| r.contains(x, z))
            .map(|r| r.column)
            .unwrap_or(self.base)
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn last_placement(&self, participant: ParticipantId) -> Option<&Placement> {
        self.placements.iter().rev().find(|p| p.participant == participant)
    }

    pub fn return_point(&self, participant: ParticipantId) -> Option<&ReturnPoint> {
        self.return_points.get(&participant)
    }

    /// Simulate the participant placing a bed: an explicit, non-forced return point.
    pub fn set_bed(&mut self, participant: ParticipantId, pos: BlockPos) {
        self.return_points.insert(
            participant,
            ReturnPoint {
                dimension: self.dimension.clone(),
                pos,
                forced: false,
                backed_by_block: true,
            },
        );
    }

    pub fn is_chunk_loaded(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.loaded_chunks.borrow().contains(&(chunk_x, chunk_z))
    }

    pub fn height_samples(&self) -> u64 {
        self.height_samples.get()
    }
}

impl WorldView for SimWorld {
    fn in_world_bounds(&self, pos: BlockPos) -> bool {
        pos.y >= Self::MIN_BUILD_HEIGHT
            && pos.y < Self::MAX_BUILD_HEIGHT
            && pos.x.abs() <= self.horizontal_limit
            && pos.z.abs() <= self.horizontal_limit
    }

    fn min_build_height(&self) -> i32 {
        Self::MIN_BUILD_HEIGHT
    }

    fn ensure_chunk(&self, chunk_x: i32, chunk_z: i32) {
        self.loaded_chunks.borrow_mut().insert((chunk_x, chunk_z));
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.height_samples.set(self.height_samples.get() + 1);
        self.column(x, z).height
    }

    fn biome_has_tag(&self, pos: BlockPos, tag: BiomeTag) -> bool {
        self.column(pos.x, pos.z).biome == Some(tag)
    }

    fn has_water(&self, pos: BlockPos) -> bool {
        let column = self.column(pos.x, pos.z);
        column.water && pos.y == column.height
    }

    fn is_sturdy_top(&self, pos: BlockPos) -> bool {
        let column = self.column(pos.x, pos.z);
        match pos.y.cmp(&(column.height - 1)) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => column.sturdy_ground,
            std::cmp::Ordering::Greater => false,
        }
    }

    fn is_collision_free(&self, pos: BlockPos) -> bool {
        let column = self.column(pos.x, pos.z);
        pos.y >= column.height && pos.y < column.height + i32::from(column.headroom)
    }

    fn present_participants(&self) -> Vec<PresentParticipant> {
        self.participants.clone()
    }

    fn shared_spawn(&self) -> BlockPos {
        let (x, z) = self.shared_spawn;
        BlockPos::new(x, self.column(x, z).height, z)
    }
}

impl PlacementSink for SimWorld {
    fn place(&mut self, participant: ParticipantId, target: EntityPos, yaw: f32) {
        self.placements.push(Placement {
            participant,
            target,
            yaw,
        });
        self.add_participant(participant, target);
    }

    fn set_default_return_point(&mut self, participant: ParticipantId, dimension: &str, pos: BlockPos) {
        self.return_points.insert(
            participant,
            ReturnPoint {
                dimension: dimension.to_string(),
                pos,
                forced: true,
                backed_by_block: false,
            },
        );
    }
}
