//! Candidate generation and safety validation.
//!
//! A search draws columns uniformly inside the configured radius around a centre point,
//! samples the surface height there, and returns the first position that passes every
//! safety predicate. It never mutates world state beyond asking the host to load chunks.
//!
//! Predicates run in this order and stop at the first failure:
//!
//! 1. inside world bounds
//! 2. above the minimum build height
//! 3. biome not tagged ocean or river
//! 4. no water at feet or head
//! 5. sturdy ground directly below
//! 6. feet and head volumes free of collision geometry
//! 7. surface within `height_diff_limit` across the 7x7 window
//! 8. no other present participant closer than `min_distance`

use std::fmt;

use rand::Rng;

use crate::config::SpawnConfig;
use crate::logutil::spawn_trace;
use crate::spawn::host::{BiomeTag, WorldView};
use crate::spawn::types::{BlockPos, ParticipantId};

/// Half-width of the flatness window (offsets -3..=3 on both axes).
pub const FLATNESS_RADIUS: i32 = 3;

/// Source of horizontal candidate offsets.
///
/// Every [`rand::Rng`] is one; tests may script exact offsets.
pub trait OffsetSource {
    /// Uniform offset in `-range..=range`.
    fn next_offset(&mut self, range: i32) -> i32;
}

impl<R: Rng> OffsetSource for R {
    fn next_offset(&mut self, range: i32) -> i32 {
        self.gen_range(-range..=range)
    }
}

/// Why a candidate was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    OutOfBounds,
    BelowMinBuildHeight,
    OceanOrRiver,
    Water,
    GroundNotSturdy,
    FeetBlocked,
    HeadBlocked,
    NotFlat,
    TooCloseToOthers,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::OutOfBounds => "out of world bounds",
            Rejection::BelowMinBuildHeight => "below min build height",
            Rejection::OceanOrRiver => "ocean/river biome",
            Rejection::Water => "water at feet or head",
            Rejection::GroundNotSturdy => "ground not sturdy",
            Rejection::FeetBlocked => "feet blocked",
            Rejection::HeadBlocked => "head blocked",
            Rejection::NotFlat => "not flat enough",
            Rejection::TooCloseToOthers => "too close to others",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// First acceptable position, and the 1-based try that produced it.
    Found { pos: BlockPos, tries_used: u32 },
    /// Budget exhausted. Expected in hostile terrain; the caller escalates or falls back.
    NotFound { tries: u32 },
}

impl SearchOutcome {
    pub fn found(&self) -> Option<BlockPos> {
        match self {
            SearchOutcome::Found { pos, .. } => Some(*pos),
            SearchOutcome::NotFound { .. } => None,
        }
    }
}

/// Load the column's chunk and return the surface position at `(x, z)`.
pub fn sample_column<W: WorldView + ?Sized>(world: &W, x: i32, z: i32) -> BlockPos {
    let column = BlockPos::new(x, 0, z);
    let (chunk_x, chunk_z) = column.chunk();
    world.ensure_chunk(chunk_x, chunk_z);
    BlockPos::new(x, world.surface_height(x, z), z)
}

/// Search up to `max_tries` candidates around `center` for a safe spawn position.
pub fn search<W, S>(
    world: &W,
    center: BlockPos,
    config: &SpawnConfig,
    source: &mut S,
    max_tries: u32,
    seeker: ParticipantId,
) -> SearchOutcome
where
    W: WorldView + ?Sized,
    S: OffsetSource + ?Sized,
{
    let range = config.spawn_range.max(0);
    for attempt in 1..=max_tries {
        let x = center.x.saturating_add(source.next_offset(range));
        let z = center.z.saturating_add(source.next_offset(range));
        let pos = sample_column(world, x, z);
        spawn_trace!(config.debug_logs, "try#{} candidate {}", attempt, pos);

        match check_candidate(world, pos, config, seeker) {
            Ok(()) => {
                spawn_trace!(config.debug_logs, "accept: {}", pos);
                return SearchOutcome::Found {
                    pos,
                    tries_used: attempt,
                };
            }
            Err(rejection) => {
                spawn_trace!(config.debug_logs, "reject: {}", rejection);
            }
        }
    }
    SearchOutcome::NotFound { tries: max_tries }
}

/// Run every safety predicate against `pos`, stopping at the first failure.
pub fn check_candidate<W: WorldView + ?Sized>(
    world: &W,
    pos: BlockPos,
    config: &SpawnConfig,
    seeker: ParticipantId,
) -> Result<(), Rejection> {
    if !world.in_world_bounds(pos) {
        return Err(Rejection::OutOfBounds);
    }
    if pos.y <= world.min_build_height() {
        return Err(Rejection::BelowMinBuildHeight);
    }
    if world.biome_has_tag(pos, BiomeTag::Ocean) || world.biome_has_tag(pos, BiomeTag::River) {
        return Err(Rejection::OceanOrRiver);
    }
    if world.has_water(pos) || world.has_water(pos.above()) {
        return Err(Rejection::Water);
    }
    if !world.is_sturdy_top(pos.below()) {
        return Err(Rejection::GroundNotSturdy);
    }
    if !world.is_collision_free(pos) {
        return Err(Rejection::FeetBlocked);
    }
    if !world.is_collision_free(pos.above()) {
        return Err(Rejection::HeadBlocked);
    }
    if !is_flat_enough(world, pos, config.height_diff_limit) {
        return Err(Rejection::NotFlat);
    }
    if !is_far_from_others(world, pos, config.min_distance, seeker) {
        return Err(Rejection::TooCloseToOthers);
    }
    Ok(())
}

/// Every column in the 7x7 window must sit within `limit` blocks of the candidate's height.
pub fn is_flat_enough<W: WorldView + ?Sized>(world: &W, pos: BlockPos, limit: i32) -> bool {
    for dx in -FLATNESS_RADIUS..=FLATNESS_RADIUS {
        for dz in -FLATNESS_RADIUS..=FLATNESS_RADIUS {
            let y = world.surface_height(pos.x + dx, pos.z + dz);
            if (y - pos.y).abs() > limit {
                return false;
            }
        }
    }
    true
}

/// No other present participant may be closer than `min_distance`. The seeker is ignored.
pub fn is_far_from_others<W: WorldView + ?Sized>(
    world: &W,
    pos: BlockPos,
    min_distance: i32,
    seeker: ParticipantId,
) -> bool {
    let min = f64::from(min_distance);
    world
        .present_participants()
        .iter()
        .filter(|other| other.id != seeker)
        .all(|other| pos.distance_to(other.pos) >= min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::sim::{Column, SimWorld};
    use crate::spawn::types::EntityPos;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> SpawnConfig {
        SpawnConfig {
            spawn_range: 100,
            ..SpawnConfig::default()
        }
    }

    #[test]
    fn flat_dry_world_accepts_first_candidate() {
        let world = SimWorld::new("minecraft:overworld");
        let mut rng = StdRng::seed_from_u64(7);
        let me = ParticipantId::new_v4();
        let outcome = search(&world, world.shared_spawn(), &config(), &mut rng, 5, me);
        match outcome {
            SearchOutcome::Found { pos, tries_used } => {
                assert_eq!(tries_used, 1);
                assert_eq!(pos.y, SimWorld::DEFAULT_SURFACE);
                assert!((pos.x - world.shared_spawn().x).abs() <= 100);
            }
            other => panic!("expected a position, got {:?}", other),
        }
    }

    #[test]
    fn ocean_world_exhausts_budget() {
        let world = SimWorld::new("minecraft:overworld").with_base(Column::ocean(62));
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = search(
            &world,
            world.shared_spawn(),
            &config(),
            &mut rng,
            12,
            ParticipantId::new_v4(),
        );
        assert_eq!(outcome, SearchOutcome::NotFound { tries: 12 });
        assert!(outcome.found().is_none());
    }

    #[test]
    fn predicates_reject_in_order() {
        let me = ParticipantId::new_v4();
        let cfg = config();
        let world = SimWorld::new("minecraft:overworld")
            .with_column(10, 10, Column::land(64).with_water())
            .with_column(20, 20, Column::land(64).with_soft_ground())
            .with_column(30, 30, Column::land(64).with_headroom(0))
            .with_column(40, 40, Column::land(64).with_headroom(1))
            .with_column(50, 50, Column::river(64).with_water());

        let at = |x: i32, z: i32| sample_column(&world, x, z);
        assert_eq!(check_candidate(&world, at(10, 10), &cfg, me), Err(Rejection::Water));
        assert_eq!(
            check_candidate(&world, at(20, 20), &cfg, me),
            Err(Rejection::GroundNotSturdy)
        );
        assert_eq!(check_candidate(&world, at(30, 30), &cfg, me), Err(Rejection::FeetBlocked));
        assert_eq!(check_candidate(&world, at(40, 40), &cfg, me), Err(Rejection::HeadBlocked));
        // biome is checked before water
        assert_eq!(check_candidate(&world, at(50, 50), &cfg, me), Err(Rejection::OceanOrRiver));
        assert_eq!(
            check_candidate(&world, BlockPos::new(0, SimWorld::MIN_BUILD_HEIGHT, 0), &cfg, me),
            Err(Rejection::BelowMinBuildHeight)
        );
        assert_eq!(
            check_candidate(&world, BlockPos::new(0, 4000, 0), &cfg, me),
            Err(Rejection::OutOfBounds)
        );
    }

    #[test]
    fn flatness_window_spans_three_blocks_each_way() {
        let me = ParticipantId::new_v4();
        let cfg = config();
        let world = SimWorld::new("minecraft:overworld")
            .with_column(3, 3, Column::land(64 + 5))
            .with_column(103, 100, Column::land(64 + 4));
        assert_eq!(check_candidate(&world, at_surface(&world, 0, 0), &cfg, me), Err(Rejection::NotFlat));
        // exactly at the limit is still flat
        assert_eq!(check_candidate(&world, at_surface(&world, 100, 100), &cfg, me), Ok(()));
        // four columns away is outside the window
        assert_eq!(check_candidate(&world, at_surface(&world, -1, -1), &cfg, me), Ok(()));
    }

    fn at_surface(world: &SimWorld, x: i32, z: i32) -> BlockPos {
        sample_column(world, x, z)
    }

    #[test]
    fn isolation_ignores_the_seeker() {
        let me = ParticipantId::new_v4();
        let other = ParticipantId::new_v4();
        let cfg = config();
        let world = SimWorld::new("minecraft:overworld")
            .with_participant(me, EntityPos::new(0.5, 65.0, 0.5))
            .with_participant(other, EntityPos::new(1000.0, 65.0, 1000.0));
        let pos = at_surface(&world, 0, 0);
        assert_eq!(check_candidate(&world, pos, &cfg, me), Ok(()));

        let far = at_surface(&world, 1000, 800);
        assert_eq!(
            check_candidate(&world, far, &cfg, me),
            Err(Rejection::TooCloseToOthers)
        );
        let edge = at_surface(&world, 1000, 700);
        assert!(is_far_from_others(&world, edge, 300, me));
    }

    #[test]
    fn negative_range_searches_only_the_centre() {
        let cfg = SpawnConfig {
            spawn_range: -50,
            ..config()
        };
        let world = SimWorld::new("minecraft:overworld").with_shared_spawn(7, -9);
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = search(&world, world.shared_spawn(), &cfg, &mut rng, 3, ParticipantId::new_v4());
        assert_eq!(outcome.found(), Some(BlockPos::new(7, SimWorld::DEFAULT_SURFACE, -9)));
    }

    #[test]
    fn sampling_loads_the_candidate_chunk() {
        let world = SimWorld::new("minecraft:overworld");
        sample_column(&world, -17, 33);
        assert!(world.is_chunk_loaded(-2, 2));
    }
}
