//! Integration tests for join/respawn precedence in the spawn coordinator.
//! Each test builds a coordinator over a throwaway backup directory and drives it
//! with the in-memory SimWorld host.
mod common;

use common::backup_in;
use rand::rngs::StdRng;
use rand::SeedableRng;
use spawnkeeper::config::SpawnConfig;
use spawnkeeper::spawn::{
    AssignmentSource, BlockPos, EntityPos, ParticipantContext, ParticipantId,
    PrimaryStore, Resolution, ReturnPoint, SimWorld, SpawnCoordinator, SpawnRecord, Trigger,
};
use tempfile::TempDir;

const OVERWORLD: &str = "minecraft:overworld";

fn test_config() -> SpawnConfig {
    SpawnConfig {
        spawn_range: 500,
        enabled_dimensions: Vec::new(),
        ..SpawnConfig::default()
    }
}

fn setup() -> (SpawnCoordinator, SimWorld, TempDir) {
    let dir = TempDir::new().unwrap();
    let coordinator = SpawnCoordinator::new(test_config(), PrimaryStore::new(), backup_in(dir.path()));
    (coordinator, SimWorld::new(OVERWORLD), dir)
}

#[test]
fn first_join_assigns_and_writes_both_stores() {
    let (mut coordinator, mut world, _dir) = setup();
    let alex = ParticipantContext::new(ParticipantId::new_v4(), "Alex", OVERWORLD);
    let mut rng = StdRng::seed_from_u64(3);

    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Join, &mut rng);
    let pos = match outcome {
        Resolution::Assigned {
            pos,
            source: AssignmentSource::Search { tries_used: 1, escalated: false },
        } => pos,
        other => panic!("unexpected resolution {:?}", other),
    };

    let placement = world.last_placement(alex.id).unwrap();
    assert_eq!(placement.target, pos.standing_point());
    assert_eq!(placement.yaw, 0.0);
    assert_eq!(world.return_point(alex.id).unwrap().pos, pos);

    let stored = coordinator.primary().get_in(alex.id, OVERWORLD).unwrap();
    assert!(stored.assigned);
    assert_eq!(stored.pos(), pos);
    let backed_up = coordinator.backup().load(alex.id, "Alex", OVERWORLD).unwrap();
    assert_eq!(backed_up.pos(), pos);
}

#[test]
fn second_join_is_a_no_op() {
    let (mut coordinator, mut world, _dir) = setup();
    let alex = ParticipantContext::new(ParticipantId::new_v4(), "Alex", OVERWORLD);
    let mut rng = StdRng::seed_from_u64(11);
    coordinator.resolve(&mut world, &alex, Trigger::Join, &mut rng);

    let mutations = coordinator.primary().mutation_count();
    let writes = coordinator.backup().write_count();
    let placements = world.placements().len();

    // The registered return point is forced, so it must not count as explicit.
    let again = alex
        .clone()
        .with_return_point(world.return_point(alex.id).cloned());
    for _ in 0..2 {
        let outcome = coordinator.resolve(&mut world, &again, Trigger::Join, &mut rng);
        assert_eq!(outcome, Resolution::AlreadyAssigned);
    }
    assert_eq!(coordinator.primary().mutation_count() - mutations, 0);
    assert_eq!(coordinator.backup().write_count() - writes, 0);
    assert_eq!(world.placements().len(), placements);
}

#[test]
fn backup_override_beats_primary_record() {
    let dir = TempDir::new().unwrap();
    let id = ParticipantId::new_v4();
    let r1 = SpawnRecord::assigned(BlockPos::new(10, 70, 10), OVERWORLD, "Alex");
    let r2 = SpawnRecord::assigned(BlockPos::new(-250, 81, 900), OVERWORLD, "Alex");

    let mut primary = PrimaryStore::new();
    primary.put(id, r1);
    let mut backup = backup_in(dir.path());
    backup.save(id, "Alex", &r2).unwrap();

    let mut coordinator = SpawnCoordinator::new(test_config(), primary, backup);
    let mut world = SimWorld::new(OVERWORLD);
    let alex = ParticipantContext::new(id, "Alex", OVERWORLD);

    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Join, &mut StdRng::seed_from_u64(0));
    assert_eq!(outcome, Resolution::OverrideApplied(r2.pos()));
    assert_eq!(coordinator.primary().get(id).unwrap().pos(), r2.pos());
    assert!(coordinator.primary().is_assigned(id, OVERWORLD));
    assert_eq!(
        world.last_placement(id).unwrap().target,
        EntityPos::new(-249.5, 82.0, 900.5)
    );

    // Now both stores agree, so the next join is idempotent.
    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Join, &mut StdRng::seed_from_u64(0));
    assert_eq!(outcome, Resolution::AlreadyAssigned);
}

#[test]
fn records_from_another_dimension_are_ignored() {
    let (mut coordinator, mut world, _dir) = setup();
    let id = ParticipantId::new_v4();
    let in_a = ParticipantContext::new(id, "Alex", "A");
    let mut rng = StdRng::seed_from_u64(5);
    let first = coordinator.resolve(&mut world, &in_a, Trigger::Join, &mut rng);
    assert!(matches!(first, Resolution::Assigned { .. }));

    assert!(coordinator.primary().get_in(id, "B").is_none());
    assert!(coordinator.backup().load(id, "Alex", "B").is_none());

    let in_b = ParticipantContext::new(id, "Alex", "B");
    let mut world_b = SimWorld::new("B");
    let second = coordinator.resolve(&mut world_b, &in_b, Trigger::Join, &mut rng);
    assert!(matches!(second, Resolution::Assigned { .. }), "got {:?}", second);
    assert_eq!(coordinator.primary().get(id).unwrap().dimension, "B");
}

#[test]
fn explicit_return_point_defers_everything() {
    let (mut coordinator, mut world, _dir) = setup();
    let id = ParticipantId::new_v4();
    world.set_bed(id, BlockPos::new(3, 64, 3));
    let alex = ParticipantContext::new(id, "Alex", OVERWORLD)
        .with_return_point(world.return_point(id).cloned());
    let mut rng = StdRng::seed_from_u64(9);

    assert_eq!(
        coordinator.resolve(&mut world, &alex, Trigger::Join, &mut rng),
        Resolution::DeferredToHost
    );
    assert_eq!(
        coordinator.resolve(&mut world, &alex, Trigger::Respawn, &mut rng),
        Resolution::DeferredToHost
    );
    assert!(world.placements().is_empty());
    assert_eq!(coordinator.primary().mutation_count(), 0);
    assert_eq!(coordinator.backup().write_count(), 0);
}

#[test]
fn explicit_return_point_beats_a_differing_backup_record() {
    let dir = TempDir::new().unwrap();
    let id = ParticipantId::new_v4();
    let mut primary = PrimaryStore::new();
    primary.put(id, SpawnRecord::assigned(BlockPos::new(10, 64, 10), OVERWORLD, "Alex"));
    let mut backup = backup_in(dir.path());
    let manual = SpawnRecord::assigned(BlockPos::new(-600, 72, 45), OVERWORLD, "Alex");
    backup.save(id, "Alex", &manual).unwrap();
    let mut coordinator = SpawnCoordinator::new(test_config(), primary, backup);
    let mutations = coordinator.primary().mutation_count();
    let writes = coordinator.backup().write_count();

    let mut world = SimWorld::new(OVERWORLD);
    world.set_bed(id, BlockPos::new(3, 64, 3));
    let alex = ParticipantContext::new(id, "Alex", OVERWORLD)
        .with_return_point(world.return_point(id).cloned());
    let mut rng = StdRng::seed_from_u64(13);

    for trigger in [Trigger::Join, Trigger::Respawn] {
        assert_eq!(
            coordinator.resolve(&mut world, &alex, trigger, &mut rng),
            Resolution::DeferredToHost
        );
    }
    assert!(world.placements().is_empty());
    assert_eq!(world.height_samples(), 0);
    assert_eq!(coordinator.primary().mutation_count(), mutations);
    assert_eq!(coordinator.backup().write_count(), writes);
    assert_eq!(coordinator.primary().get(id).unwrap().pos(), BlockPos::new(10, 64, 10));
}

#[test]
fn destroyed_bed_no_longer_blocks_the_override() {
    let dir = TempDir::new().unwrap();
    let id = ParticipantId::new_v4();
    let mut backup = backup_in(dir.path());
    let manual = SpawnRecord::assigned(BlockPos::new(-600, 72, 45), OVERWORLD, "Alex");
    backup.save(id, "Alex", &manual).unwrap();
    let mut coordinator = SpawnCoordinator::new(test_config(), PrimaryStore::new(), backup);
    let mut world = SimWorld::new(OVERWORLD);

    let gone = ReturnPoint {
        dimension: OVERWORLD.to_string(),
        pos: BlockPos::new(3, 64, 3),
        forced: false,
        backed_by_block: false,
    };
    let alex = ParticipantContext::new(id, "Alex", OVERWORLD).with_return_point(Some(gone));
    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Respawn, &mut StdRng::seed_from_u64(2));
    assert_eq!(outcome, Resolution::OverrideApplied(manual.pos()));
    assert_eq!(world.last_placement(id).unwrap().target, manual.pos().standing_point());
}

#[test]
fn disabled_dimension_is_ignored() {
    let dir = TempDir::new().unwrap();
    let config = SpawnConfig {
        enabled_dimensions: vec![OVERWORLD.to_string()],
        ..SpawnConfig::default()
    };
    let mut coordinator = SpawnCoordinator::new(config, PrimaryStore::new(), backup_in(dir.path()));
    let mut world = SimWorld::new("minecraft:the_nether");
    let alex = ParticipantContext::new(ParticipantId::new_v4(), "Alex", "minecraft:the_nether");
    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Join, &mut StdRng::seed_from_u64(1));
    assert_eq!(outcome, Resolution::Ignored);
    assert!(world.placements().is_empty());
}

#[test]
fn respawn_without_any_record_defers_to_host() {
    let (mut coordinator, mut world, _dir) = setup();
    let alex = ParticipantContext::new(ParticipantId::new_v4(), "Alex", OVERWORLD);
    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Respawn, &mut StdRng::seed_from_u64(1));
    assert_eq!(outcome, Resolution::DeferredToHost);
    assert!(world.placements().is_empty());
    assert_eq!(world.height_samples(), 0, "respawn must never search");
}

#[test]
fn respawn_returns_to_stored_spawn_keeping_yaw() {
    let (mut coordinator, mut world, _dir) = setup();
    let alex = ParticipantContext::new(ParticipantId::new_v4(), "Alex", OVERWORLD);
    let mut rng = StdRng::seed_from_u64(21);
    let pos = coordinator
        .resolve(&mut world, &alex, Trigger::Join, &mut rng)
        .placed_at()
        .unwrap();

    let dying = alex.clone().with_yaw(135.0);
    let outcome = coordinator.resolve(&mut world, &dying, Trigger::Respawn, &mut rng);
    assert_eq!(outcome, Resolution::Restored(pos));
    let placement = world.last_placement(alex.id).unwrap();
    assert_eq!(placement.target, pos.standing_point());
    assert_eq!(placement.yaw, 135.0);
}

#[test]
fn respawn_uses_primary_when_backup_is_gone() {
    let dir = TempDir::new().unwrap();
    let id = ParticipantId::new_v4();
    let stored = SpawnRecord::assigned(BlockPos::new(40, 66, -8), OVERWORLD, "Alex");
    let mut primary = PrimaryStore::new();
    primary.put(id, stored.clone());
    let mut coordinator = SpawnCoordinator::new(test_config(), primary, backup_in(dir.path()));
    let mut world = SimWorld::new(OVERWORLD);

    let alex = ParticipantContext::new(id, "Alex", OVERWORLD);
    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Respawn, &mut StdRng::seed_from_u64(1));
    assert_eq!(outcome, Resolution::Restored(stored.pos()));
    // the backup is re-created from the primary record
    assert_eq!(coordinator.backup().load(id, "Alex", OVERWORLD).unwrap().pos(), stored.pos());
}

#[test]
fn respawn_prefers_a_differing_backup_record() {
    let dir = TempDir::new().unwrap();
    let id = ParticipantId::new_v4();
    let mut primary = PrimaryStore::new();
    primary.put(id, SpawnRecord::assigned(BlockPos::new(1, 64, 1), OVERWORLD, "Alex"));
    let mut backup = backup_in(dir.path());
    let manual = SpawnRecord::assigned(BlockPos::new(777, 90, 777), OVERWORLD, "Alex");
    backup.save(id, "Alex", &manual).unwrap();
    let mut coordinator = SpawnCoordinator::new(test_config(), primary, backup);
    let mut world = SimWorld::new(OVERWORLD);

    let alex = ParticipantContext::new(id, "Alex", OVERWORLD);
    let outcome = coordinator.resolve(&mut world, &alex, Trigger::Respawn, &mut StdRng::seed_from_u64(1));
    assert_eq!(outcome, Resolution::OverrideApplied(manual.pos()));
    assert_eq!(coordinator.primary().get(id).unwrap().pos(), manual.pos());
}
