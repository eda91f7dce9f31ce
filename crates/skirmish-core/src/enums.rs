//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Broad gameplay category of an entity. Used by the renderer and harness;
/// combat and collision rules never branch on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[default]
    Player,
    Enemy,
    Summon,
    Projectile,
    Prop,
}

/// Damage type tag carried by damage events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    #[default]
    Physical,
    Fire,
    Frost,
    Poison,
    Bleed,
    Corruption,
    Energy,
}

/// Which pool a heal restores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealKind {
    #[default]
    Health,
    Shield,
}

/// Timed motion override kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionKind {
    Dash,
    Charge,
    Knockback,
}

impl MotionKind {
    /// Eased fraction of the total distance covered at normalized time `t`.
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let inv = 1.0 - t;
        match self {
            // ease-out quadratic
            MotionKind::Dash | MotionKind::Charge => 1.0 - inv * inv,
            // ease-out cubic: hard shove that bleeds off
            MotionKind::Knockback => 1.0 - inv * inv * inv,
        }
    }
}

/// Lifecycle of a collision pair across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

/// Why a damage or heal event was dropped without mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Target id no longer resolves, or lacks a Health component.
    MissingTarget,
    /// Target is dead (or at zero health pending its death transition).
    TargetDead,
    NonPositiveAmount,
    SelfDamage,
    SameTeam,
    Invulnerable,
    /// Shield heal on an entity without a Shield.
    NoShield,
}
