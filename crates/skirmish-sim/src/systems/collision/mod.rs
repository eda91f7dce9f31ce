//! Collision system.
//!
//! Resolution runs in the fixed pass right after movement: refresh bounds
//! and the spatial index for every enabled collider, gather candidate pairs
//! from the index, run the narrow phase and separate penetrating physical
//! pairs. The frame pass repeats the same detection over the replica-synced
//! poses and diffs this frame's contacts against the last to emit
//! enter/stay/exit notifications.

pub mod narrow;
pub mod separation;

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;

use skirmish_core::components::{Collider, Health, Movement, RemoteReplica, Transform};
use skirmish_core::config::CollisionConfig;
use skirmish_core::enums::ContactPhase;
use skirmish_core::events::CollisionEvent;
use skirmish_core::types::EntityId;

use crate::schedule::{priority, Phase, System};
use crate::spatial::SpatialGrid;
use crate::state::SimState;
use crate::world::{id_of, World};

use narrow::Placed;

#[derive(Debug, Clone, Copy)]
struct Body {
    collider: Collider,
    center: Vec3,
}

impl Body {
    fn placed(&self) -> Placed {
        Placed {
            shape: self.collider.shape,
            center: self.center,
        }
    }
}

/// Pair key with `a < b`, mapped to whether either side is a trigger.
pub type ContactSet = BTreeMap<(EntityId, EntityId), bool>;

#[derive(Default)]
pub struct CollisionSystem {
    contacts: ContactSet,
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs in contact at the end of the last run.
    pub fn active_pairs(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.contacts.keys().copied()
    }

    /// One detection pass. Returns the notifications for this frame.
    pub fn step(
        &mut self,
        world: &mut World,
        grid: &mut SpatialGrid,
        config: &CollisionConfig,
    ) -> Vec<CollisionEvent> {
        let current = resolve(world, grid, config);
        self.commit(current)
    }

    fn commit(&mut self, current: ContactSet) -> Vec<CollisionEvent> {
        let events = diff(&self.contacts, &current);
        self.contacts = current;
        events
    }
}

/// Refresh, detect and separate. Returns the pairs in contact.
pub fn resolve(
    world: &mut World,
    grid: &mut SpatialGrid,
    config: &CollisionConfig,
) -> ContactSet {
    let mut bodies = refresh(world, grid);
    let pairs = broad_phase(&bodies, grid);

    let fallback = config.fallback_axis.try_normalize().unwrap_or(Vec3::X);
    let mut current = ContactSet::new();
    let mut moved = BTreeSet::new();

    for (a, b) in pairs {
        let (Some(body_a), Some(body_b)) = (bodies.get(&a).copied(), bodies.get(&b).copied())
        else {
            continue;
        };
        let Some(contact) = narrow::contact(&body_a.placed(), &body_b.placed()) else {
            continue;
        };
        if contact.depth <= config.contact_epsilon {
            continue;
        }

        let trigger = body_a.collider.is_trigger || body_b.collider.is_trigger;
        current.insert((a, b), trigger);
        if trigger {
            continue;
        }

        let normal = contact.normal.unwrap_or(fallback);
        let (share_a, share_b) = separation::shares(&body_a.collider, &body_b.collider);
        for (id, push) in [
            (a, -normal * contact.depth * share_a),
            (b, normal * contact.depth * share_b),
        ] {
            if push == Vec3::ZERO {
                continue;
            }
            displace(world, id, push);
            if let Some(body) = bodies.get_mut(&id) {
                body.center += push;
            }
            moved.insert(id);
        }
    }

    for id in moved {
        let Some(body) = bodies.get_mut(&id) else {
            continue;
        };
        body.collider.bounds = body.collider.shape.bounds_at(body.center);
        if let Some(mut collider) = world.get_mut::<Collider>(id) {
            collider.bounds = body.collider.bounds;
        }
        grid.update(id, body.collider.bounds);
    }

    current
}

impl System for CollisionSystem {
    fn name(&self) -> &str {
        "collision"
    }

    fn priority(&self) -> i32 {
        priority::COLLISION
    }

    fn run(&mut self, state: &mut SimState, _dt: f64) {
        let mut current = resolve(&mut state.world, &mut state.grid, &state.config.collision);
        // Pairs the fixed pass already pushed apart still touched this frame.
        for (pair, trigger) in std::mem::take(&mut state.fixed_contacts) {
            if state.grid.contains(pair.0) && state.grid.contains(pair.1) {
                current.entry(pair).or_insert(trigger);
            }
        }
        let events = self.commit(current);
        state.collision_events.extend(events);
    }
}

/// Fixed-pass separation after each movement step. Contacts are handed to
/// the frame pass, which owns the notifications.
pub struct SeparationSystem;

impl System for SeparationSystem {
    fn name(&self) -> &str {
        "separation"
    }

    fn phase(&self) -> Phase {
        Phase::Fixed
    }

    fn priority(&self) -> i32 {
        priority::COLLISION
    }

    fn run(&mut self, state: &mut SimState, _dt: f64) {
        let touched = resolve(&mut state.world, &mut state.grid, &state.config.collision);
        state.fixed_contacts.extend(touched);
    }
}

/// Recompute bounds for every enabled, living collider and sync the index.
/// Anything else is dropped from the index. Remote replicas never yield,
/// whatever their collider says.
fn refresh(world: &mut World, grid: &mut SpatialGrid) -> BTreeMap<EntityId, Body> {
    let mut bodies = BTreeMap::new();
    for (entity, (transform, collider, health, remote)) in world.ecs_mut().query_mut::<(
        &Transform,
        &mut Collider,
        Option<&Health>,
        Option<&RemoteReplica>,
    )>() {
        if !collider.enabled || health.is_some_and(|h| h.dead) {
            continue;
        }
        let center = transform.position + collider.offset;
        collider.bounds = collider.shape.bounds_at(center);
        let mut body = Body {
            collider: *collider,
            center,
        };
        if remote.is_some() {
            body.collider.can_move = false;
        }
        bodies.insert(id_of(entity), body);
    }

    for id in grid.ids() {
        if !bodies.contains_key(&id) {
            grid.remove(id);
        }
    }
    for (id, body) in &bodies {
        grid.insert(*id, body.collider.bounds);
    }
    bodies
}

/// Unordered candidate pairs `(a, b)` with `a < b`, ascending.
fn broad_phase(bodies: &BTreeMap<EntityId, Body>, grid: &SpatialGrid) -> Vec<(EntityId, EntityId)> {
    let mut pairs = Vec::new();
    for (&a, body_a) in bodies {
        if !grid.contains(a) {
            continue;
        }
        for b in grid.query_box(&body_a.collider.bounds) {
            if b <= a {
                continue;
            }
            let Some(body_b) = bodies.get(&b) else {
                continue;
            };
            let (ca, cb) = (&body_a.collider, &body_b.collider);
            if ca.is_static && cb.is_static {
                continue;
            }
            if ca.layer & cb.mask == 0 || cb.layer & ca.mask == 0 {
                continue;
            }
            pairs.push((a, b));
        }
    }
    pairs
}

/// Move an entity and strip the velocity that drove it into its partner.
/// Kinematic bodies keep their scripted velocity.
fn displace(world: &mut World, id: EntityId, push: Vec3) {
    if let Some(mut transform) = world.get_mut::<Transform>(id) {
        transform.position += push;
    }
    if world.get::<Collider>(id).is_some_and(|c| c.is_kinematic) {
        return;
    }
    if let Some(mut movement) = world.get_mut::<Movement>(id) {
        movement.velocity = separation::remove_approach(movement.velocity, push);
    }
}

fn diff(previous: &ContactSet, current: &ContactSet) -> Vec<CollisionEvent> {
    let mut events: Vec<CollisionEvent> = current
        .iter()
        .map(|(&(a, b), &trigger)| CollisionEvent {
            a,
            b,
            phase: if previous.contains_key(&(a, b)) {
                ContactPhase::Stay
            } else {
                ContactPhase::Enter
            },
            trigger,
        })
        .collect();
    events.extend(
        previous
            .iter()
            .filter(|(pair, _)| !current.contains_key(pair))
            .map(|(&(a, b), &trigger)| CollisionEvent {
                a,
                b,
                phase: ContactPhase::Exit,
                trigger,
            }),
    );
    events.sort_by_key(|e| (e.a, e.b));
    events
}

#[cfg(test)]
mod tests;
