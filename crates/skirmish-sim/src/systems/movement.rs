//! Kinematic integration, run on the fixed physics pass.
//!
//! Velocity is integrated from acceleration (and gravity while airborne),
//! damped by friction, clamped to the debuffed speed cap, then applied to
//! the transform. Timed motion overrides (dash, charge, knockback) replace
//! integration while active.

use glam::Vec3;

use skirmish_core::components::{
    Health, MotionOverride, Movement, RemoteReplica, StatusEffects, Transform,
};
use skirmish_core::enums::MotionKind;
use skirmish_core::types::EntityId;

use crate::combat::status;
use crate::schedule::{priority, Phase, System};
use crate::state::SimState;
use crate::world::World;

/// Height above ground within which a body counts as grounded.
const GROUND_SNAP: f32 = 1e-3;

pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn phase(&self) -> Phase {
        Phase::Fixed
    }

    fn priority(&self) -> i32 {
        priority::MOVEMENT
    }

    fn run(&mut self, state: &mut SimState, dt: f64) {
        let now = state.now();
        let ground = state.config.movement.ground_height;
        run(&mut state.world, now, dt as f32, ground);
    }
}

/// Integrate every local, living, unfrozen entity with Transform + Movement.
pub fn run(world: &mut World, now: f64, dt: f32, ground_height: f32) {
    for (_e, (transform, movement, health, debuffs, remote)) in world.ecs_mut().query_mut::<(
        &mut Transform,
        &mut Movement,
        Option<&Health>,
        Option<&StatusEffects>,
        Option<&RemoteReplica>,
    )>() {
        if remote.is_some() || health.is_some_and(|h| h.dead) {
            continue;
        }
        if debuffs.is_some_and(|d| d.is_frozen(now)) {
            movement.velocity = Vec3::ZERO;
            movement.motion = None;
            continue;
        }

        if let Some(motion) = movement.motion {
            transform.position = motion.position_at(now);
            if motion.is_finished(now) {
                movement.motion = None;
                movement.velocity = Vec3::ZERO;
            }
            continue;
        }

        let mut v = movement.velocity + movement.acceleration * dt;
        if movement.gravity > 0.0 && !movement.grounded {
            v.y -= movement.gravity * dt;
        }

        let mut horizontal = Vec3::new(v.x, 0.0, v.z);
        if movement.friction > 0.0 {
            horizontal *= (1.0 - movement.friction * dt).max(0.0);
        }
        let cap = movement.max_speed
            * debuffs.map_or(1.0, |d| status::speed_multiplier(d, now));
        horizontal = horizontal.clamp_length_max(cap.max(0.0));
        v = Vec3::new(horizontal.x, v.y, horizontal.z);

        transform.position += v * dt;

        if movement.gravity > 0.0 {
            if transform.position.y <= ground_height {
                transform.position.y = ground_height;
                v.y = v.y.max(0.0);
                movement.grounded = true;
            } else if transform.position.y > ground_height + GROUND_SNAP {
                movement.grounded = false;
            }
        }
        movement.velocity = v;
    }
}

/// Start a dash, charge or knockback. Rejected while another override is
/// active, for non-positive durations, zero directions, and dead, frozen
/// or missing entities.
pub fn start_motion(
    world: &mut World,
    id: EntityId,
    kind: MotionKind,
    direction: Vec3,
    distance: f32,
    duration: f64,
    now: f64,
) -> bool {
    if !(duration > 0.0) || !distance.is_finite() {
        return false;
    }
    let Some(direction) = direction.try_normalize() else {
        return false;
    };
    if world.is_dead(id)
        || world
            .get::<StatusEffects>(id)
            .is_some_and(|d| d.is_frozen(now))
    {
        return false;
    }
    let Some(origin) = world.transform(id).map(|t| t.position) else {
        return false;
    };
    let Some(mut movement) = world.get_mut::<Movement>(id) else {
        return false;
    };
    if movement.motion.is_some_and(|m| !m.is_finished(now)) {
        return false;
    }
    movement.motion = Some(MotionOverride {
        kind,
        start_time: now,
        origin,
        direction,
        distance,
        duration,
    });
    movement.velocity = Vec3::ZERO;
    true
}
