//! Positional separation rules.

use glam::Vec3;

use skirmish_core::components::Collider;

/// Fraction of the penetration depth each side of a pair is displaced by.
///
/// Static colliders never move. Otherwise `can_move` decides who yields:
/// both movable split evenly, a single mover takes the whole push (its
/// partner is a server-driven replica), and two immovable bodies stay put.
pub fn shares(a: &Collider, b: &Collider) -> (f32, f32) {
    let a_moves = a.can_move && !a.is_static;
    let b_moves = b.can_move && !b.is_static;
    match (a_moves, b_moves) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => (0.0, 0.0),
    }
}

/// Remove the part of `velocity` that points against `push`, the direction
/// the body was just displaced in. Prevents re-penetration next frame.
pub fn remove_approach(velocity: Vec3, push: Vec3) -> Vec3 {
    let Some(dir) = push.try_normalize() else {
        return velocity;
    };
    let into = velocity.dot(-dir);
    if into > 0.0 {
        velocity + dir * into
    } else {
        velocity
    }
}
