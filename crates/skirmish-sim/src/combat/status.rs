//! Timed debuffs: freeze, slow and corrupted.
//!
//! Each application stamps a start time and duration on the target's
//! `StatusEffects`, replacing any previous effect of the same kind. Expiry is
//! lazy: an effect counts while `now < start + duration`.

use skirmish_core::components::{
    CorruptedEffect, Health, Movement, SlowEffect, StatusEffects, TimedEffect,
};
use skirmish_core::types::EntityId;

use crate::world::World;

/// Live speed multiplier in [0, 1] implied by `status` at `now`.
pub fn speed_multiplier(status: &StatusEffects, now: f64) -> f32 {
    if status.is_frozen(now) {
        return 0.0;
    }
    let slow = status
        .slowed
        .filter(|s| s.timing.is_active(now))
        .map_or(1.0, |s| s.multiplier);
    let corrupted = status
        .corrupted
        .filter(|c| c.timing.is_active(now))
        .map_or(0.0, |c| c.penalty(now));
    (slow * (1.0 - corrupted)).clamp(0.0, 1.0)
}

/// Movement cap after debuffs. None if the entity has no Movement.
pub fn effective_max_speed(world: &World, id: EntityId, now: f64) -> Option<f32> {
    let movement = world.get::<Movement>(id)?;
    let multiplier = world
        .get::<StatusEffects>(id)
        .map_or(1.0, |s| speed_multiplier(&s, now));
    Some(movement.max_speed * multiplier)
}

pub fn freeze(world: &mut World, id: EntityId, now: f64, duration: f64) -> bool {
    apply(world, id, duration, |status| {
        status.frozen = Some(TimedEffect {
            start: now,
            duration,
        });
    })
}

/// `multiplier` is clamped to [0, 1].
pub fn slow(world: &mut World, id: EntityId, now: f64, duration: f64, multiplier: f32) -> bool {
    if !multiplier.is_finite() {
        return false;
    }
    apply(world, id, duration, |status| {
        status.slowed = Some(SlowEffect {
            timing: TimedEffect {
                start: now,
                duration,
            },
            multiplier: multiplier.clamp(0.0, 1.0),
        });
    })
}

pub fn apply_corrupted(
    world: &mut World,
    id: EntityId,
    now: f64,
    duration: f64,
    initial_slow: f32,
    recovery_rate: f32,
) -> bool {
    apply(world, id, duration, |status| {
        status.corrupted = Some(CorruptedEffect {
            timing: TimedEffect {
                start: now,
                duration,
            },
            initial_slow: initial_slow.clamp(0.0, 1.0),
            recovery_rate: recovery_rate.max(0.0),
        });
    })
}

/// Drop expired effects so `StatusEffects` only holds live ones.
pub fn clear_expired(status: &mut StatusEffects, now: f64) {
    if status.frozen.is_some_and(|f| !f.is_active(now)) {
        status.frozen = None;
    }
    if status.slowed.is_some_and(|s| !s.timing.is_active(now)) {
        status.slowed = None;
    }
    if status.corrupted.is_some_and(|c| !c.timing.is_active(now)) {
        status.corrupted = None;
    }
}

/// Zero or negative durations, missing and dead targets are no-ops.
fn apply(
    world: &mut World,
    id: EntityId,
    duration: f64,
    stamp: impl FnOnce(&mut StatusEffects),
) -> bool {
    if !(duration > 0.0) || !world.contains(id) {
        return false;
    }
    if world.get::<Health>(id).is_some_and(|h| h.dead) {
        return false;
    }
    if let Some(mut status) = world.get_mut::<StatusEffects>(id) {
        stamp(&mut status);
        return true;
    }
    let mut status = StatusEffects::default();
    stamp(&mut status);
    world.insert(id, status)
}
