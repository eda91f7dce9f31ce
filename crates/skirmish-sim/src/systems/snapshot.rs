//! Snapshot system: builds the renderer-facing `WorldSnapshot`.
//!
//! This system is read-only; it never modifies the world.

use skirmish_core::components::{Health, Movement, Shield, StatusEffects, Transform};
use skirmish_core::enums::EntityKind;
use skirmish_core::state::{EntityView, WorldSnapshot};
use skirmish_core::types::{EntityId, SimTime};

use crate::combat::status;
use crate::interpolation::InterpolationBuffer;
use crate::world::{id_of, World};

/// One view per entity with a Transform, ascending by id.
pub fn build_snapshot(world: &World, time: &SimTime) -> WorldSnapshot {
    let now = time.now();
    let mut entities: Vec<EntityView> = world
        .ecs()
        .query::<(
            &Transform,
            Option<&EntityKind>,
            Option<&Health>,
            Option<&Shield>,
            Option<&StatusEffects>,
            Option<&Movement>,
            Option<&InterpolationBuffer>,
        )>()
        .iter()
        .map(
            |(entity, (transform, kind, health, shield, debuffs, movement, buffer))| {
                let pose = buffer
                    .and_then(|b| b.interpolated_transform(now))
                    .unwrap_or(*transform);
                let multiplier = debuffs.map_or(1.0, |d| status::speed_multiplier(d, now));
                EntityView {
                    id: id_of(entity),
                    kind: kind.copied().unwrap_or(EntityKind::Prop),
                    position: pose.position,
                    rotation: pose.rotation,
                    health_ratio: health.map(|h| h.ratio()),
                    shield_ratio: shield.map(|s| s.ratio()),
                    dead: health.is_some_and(|h| h.dead),
                    frozen: debuffs.is_some_and(|d| d.is_frozen(now)),
                    slowed: debuffs.is_some_and(|d| d.is_slowed(now)),
                    corrupted: debuffs.is_some_and(|d| d.is_corrupted(now)),
                    effective_max_speed: movement.map(|m| m.max_speed * multiplier),
                }
            },
        )
        .collect();
    entities.sort_by_key(|v| v.id);

    WorldSnapshot {
        time: *time,
        entities,
    }
}

/// Render pose for one entity: interpolated for buffered replicas, the raw
/// transform otherwise.
pub fn render_pose(world: &World, id: EntityId, render_time: f64) -> Option<Transform> {
    if let Some(buffer) = world.get::<InterpolationBuffer>(id) {
        if let Some(pose) = buffer.interpolated_transform(render_time) {
            return Some(pose);
        }
    }
    world.transform(id)
}
