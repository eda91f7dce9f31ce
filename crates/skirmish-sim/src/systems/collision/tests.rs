//! Tests for broad/narrow phase, separation precedence and notifications.

use approx::assert_abs_diff_eq;
use glam::Vec3;

use skirmish_core::components::*;
use skirmish_core::config::CollisionConfig;
use skirmish_core::enums::ContactPhase;
use skirmish_core::events::CollisionEvent;
use skirmish_core::types::EntityId;

use super::CollisionSystem;
use crate::spatial::SpatialGrid;
use crate::world::World;

struct Harness {
    world: World,
    grid: SpatialGrid,
    config: CollisionConfig,
    system: CollisionSystem,
}

impl Harness {
    fn new() -> Self {
        let config = CollisionConfig::default();
        Self {
            world: World::new(),
            grid: SpatialGrid::new(config.cell_size, config.index_capacity),
            config,
            system: CollisionSystem::new(),
        }
    }

    fn spawn(&mut self, at: Vec3, collider: Collider) -> EntityId {
        self.world.spawn((Transform::from_position(at), collider))
    }

    fn step(&mut self) -> Vec<CollisionEvent> {
        self.system
            .step(&mut self.world, &mut self.grid, &self.config)
    }

    fn pos(&self, id: EntityId) -> Vec3 {
        self.world.transform(id).unwrap().position
    }
}

fn ball() -> Collider {
    Collider::new(ColliderShape::Sphere { radius: 1.0 })
}

#[test]
fn test_movable_pair_splits_evenly() {
    let mut h = Harness::new();
    let a = h.spawn(Vec3::ZERO, ball());
    let b = h.spawn(Vec3::new(1.5, 0.0, 0.0), ball());
    h.step();

    // Overlap 0.5: each moves 0.25 along the centre line.
    assert_abs_diff_eq!(h.pos(a).x, -0.25, epsilon = 1e-5);
    assert_abs_diff_eq!(h.pos(b).x, 1.75, epsilon = 1e-5);
    assert_abs_diff_eq!(h.pos(b).x - h.pos(a).x, 2.0, epsilon = 1e-5);

    // Separated: the next frame reports an exit and moves nothing.
    let events = h.step();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].phase, ContactPhase::Exit);
    assert_abs_diff_eq!(h.pos(a).x, -0.25, epsilon = 1e-5);
}

#[test]
fn test_static_never_moves() {
    let mut h = Harness::new();
    let wall = h.spawn(
        Vec3::ZERO,
        Collider::fixed(ColliderShape::Box {
            half_extents: Vec3::new(5.0, 1.0, 5.0),
        }),
    );
    let mover = h.spawn(Vec3::new(0.0, 1.5, 0.0), ball());
    for _ in 0..3 {
        h.step();
    }
    assert_eq!(h.pos(wall), Vec3::ZERO);
    assert_abs_diff_eq!(h.pos(mover).y, 2.0, epsilon = 1e-5);
}

#[test]
fn test_replica_is_not_displaced() {
    let mut h = Harness::new();
    let replica = h.spawn(
        Vec3::ZERO,
        Collider::replica(ColliderShape::Sphere { radius: 1.0 }),
    );
    let local = h.spawn(Vec3::new(0.0, 0.0, 1.0), ball());
    h.step();
    assert_eq!(h.pos(replica), Vec3::ZERO);
    assert_abs_diff_eq!(h.pos(local).z, 2.0, epsilon = 1e-5);
}

#[test]
fn test_two_replicas_stay_put() {
    let mut h = Harness::new();
    let shape = ColliderShape::Sphere { radius: 1.0 };
    let a = h.spawn(Vec3::ZERO, Collider::replica(shape));
    let b = h.spawn(Vec3::new(0.5, 0.0, 0.0), Collider::replica(shape));
    let events = h.step();
    assert_eq!(h.pos(a), Vec3::ZERO);
    assert_eq!(h.pos(b), Vec3::new(0.5, 0.0, 0.0));
    // Still reported as a contact.
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].phase, ContactPhase::Enter);
}

#[test]
fn test_coincident_centres_use_fallback_axis() {
    let mut h = Harness::new();
    let a = h.spawn(Vec3::ZERO, ball());
    let b = h.spawn(Vec3::ZERO, ball());
    h.step();
    let (pa, pb) = (h.pos(a), h.pos(b));
    assert!(pa.is_finite() && pb.is_finite());
    assert_abs_diff_eq!(pa.x, -1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(pb.x, 1.0, epsilon = 1e-5);
}

#[test]
fn test_enter_stay_exit_sequence() {
    let mut h = Harness::new();
    let zone = h.spawn(
        Vec3::ZERO,
        Collider::trigger(ColliderShape::Sphere { radius: 3.0 }),
    );
    let walker = h.spawn(Vec3::new(1.0, 0.0, 0.0), ball());

    let first = h.step();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].phase, ContactPhase::Enter);
    assert!(first[0].trigger);
    assert!(first[0].involves(zone) && first[0].involves(walker));

    let second = h.step();
    assert_eq!(second[0].phase, ContactPhase::Stay);

    h.world.get_mut::<Transform>(walker).unwrap().position = Vec3::new(20.0, 0.0, 0.0);
    let third = h.step();
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].phase, ContactPhase::Exit);
    assert!(h.step().is_empty());
}

#[test]
fn test_trigger_overlap_has_no_response() {
    let mut h = Harness::new();
    let zone = h.spawn(
        Vec3::ZERO,
        Collider::trigger(ColliderShape::Sphere { radius: 1.0 }),
    );
    let walker = h.spawn(Vec3::new(0.5, 0.0, 0.0), ball());
    h.step();
    assert_eq!(h.pos(zone), Vec3::ZERO);
    assert_eq!(h.pos(walker), Vec3::new(0.5, 0.0, 0.0));
}

#[test]
fn test_layer_mask_filters_pairs() {
    let mut h = Harness::new();
    let a = h.spawn(Vec3::ZERO, ball().with_layers(0b01, 0b01));
    let b = h.spawn(Vec3::new(0.5, 0.0, 0.0), ball().with_layers(0b10, 0b10));
    assert!(h.step().is_empty());
    assert_eq!(h.pos(a), Vec3::ZERO);
    assert_eq!(h.pos(b), Vec3::new(0.5, 0.0, 0.0));
}

#[test]
fn test_disabled_and_dead_are_skipped_and_unindexed() {
    let mut h = Harness::new();
    let a = h.spawn(Vec3::ZERO, ball());
    let mut off = ball();
    off.enabled = false;
    let disabled = h.spawn(Vec3::new(0.5, 0.0, 0.0), off);
    let corpse = h.world.spawn((
        Transform::from_position(Vec3::new(-0.5, 0.0, 0.0)),
        ball(),
        Health {
            dead: true,
            ..Health::new(10.0)
        },
    ));
    assert!(h.step().is_empty());
    assert_eq!(h.pos(a), Vec3::ZERO);
    assert!(h.grid.contains(a));
    assert!(!h.grid.contains(disabled));
    assert!(!h.grid.contains(corpse));
}

#[test]
fn test_despawned_entity_leaves_index_and_exits() {
    let mut h = Harness::new();
    let a = h.spawn(Vec3::ZERO, Collider::replica(ColliderShape::Sphere { radius: 1.0 }));
    let b = h.spawn(Vec3::new(1.0, 0.0, 0.0), Collider::replica(ColliderShape::Sphere { radius: 1.0 }));
    h.step();
    h.world.despawn(b);
    let events = h.step();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].phase, ContactPhase::Exit);
    assert_eq!(events[0].other(a), Some(b));
    assert_eq!(h.grid.ids(), vec![a]);
}

#[test]
fn test_velocity_into_partner_removed() {
    let mut h = Harness::new();
    let mut movement = Movement::new(10.0);
    movement.velocity = Vec3::new(4.0, 0.0, 1.0);
    let runner = h.world.spawn((Transform::default(), ball(), movement));
    h.spawn(
        Vec3::new(1.5, 0.0, 0.0),
        Collider::fixed(ColliderShape::Sphere { radius: 1.0 }),
    );
    h.step();
    let v = h.world.get::<Movement>(runner).unwrap().velocity;
    assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(v.z, 1.0, epsilon = 1e-5);
}

#[test]
fn test_kinematic_keeps_velocity() {
    let mut h = Harness::new();
    let mut movement = Movement::new(10.0);
    movement.velocity = Vec3::new(4.0, 0.0, 0.0);
    let platform = h.world.spawn((Transform::default(), ball().kinematic(), movement));
    h.spawn(
        Vec3::new(1.5, 0.0, 0.0),
        Collider::fixed(ColliderShape::Sphere { radius: 1.0 }),
    );
    h.step();
    assert_eq!(
        h.world.get::<Movement>(platform).unwrap().velocity,
        Vec3::new(4.0, 0.0, 0.0)
    );
    assert_abs_diff_eq!(h.pos(platform).x, -0.5, epsilon = 1e-5);
}

#[test]
fn test_bounds_refreshed_after_separation() {
    let mut h = Harness::new();
    let a = h.spawn(Vec3::ZERO, ball());
    h.spawn(Vec3::new(1.5, 0.0, 0.0), ball());
    h.step();
    let cached = h.world.get::<Collider>(a).unwrap().bounds;
    assert_abs_diff_eq!(cached.center().x, h.pos(a).x, epsilon = 1e-5);
    assert_eq!(h.grid.bounds(a), Some(cached));
}

#[test]
fn test_large_collider_spanning_cells_collides() {
    let mut h = Harness::new();
    let big = h.spawn(
        Vec3::ZERO,
        Collider::fixed(ColliderShape::Box {
            half_extents: Vec3::new(50.0, 1.0, 50.0),
        }),
    );
    let far = h.spawn(Vec3::new(40.0, 1.5, -40.0), ball());
    let events = h.step();
    assert_eq!(events.len(), 1);
    assert!(events[0].involves(big) && events[0].involves(far));
    assert_abs_diff_eq!(h.pos(far).y, 2.0, epsilon = 1e-5);
}
