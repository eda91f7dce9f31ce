//! Events flowing into the simulation (damage/heal requests) and out of it
//! (combat effects and collision notifications) for the renderer, audio and
//! network layers.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{EntityId, PlayerId};

/// A queued damage request. Immutable once queued; consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub target: EntityId,
    pub amount: f32,
    pub source: Option<EntityId>,
    pub damage_type: Option<DamageType>,
    pub source_player: Option<PlayerId>,
    /// Simulation time at enqueue (seconds).
    pub queued_at: f64,
}

/// A queued heal request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealEvent {
    pub target: EntityId,
    pub amount: f32,
    pub source: Option<EntityId>,
    pub kind: HealKind,
    pub queued_at: f64,
}

/// Outcome of combat resolution, emitted for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CombatEffect {
    /// Damage mutated local health/shield.
    DamageApplied {
        target: EntityId,
        source: Option<EntityId>,
        amount: f32,
        shield_absorbed: f32,
        health_after: f32,
        critical: bool,
    },
    /// Damage was handed to the authority callback; local state untouched.
    DamageForwarded {
        target: EntityId,
        amount: f32,
        source_player: Option<PlayerId>,
    },
    /// Local-only feedback (damage number) for a forwarded hit.
    DamageNumber {
        target: EntityId,
        amount: f32,
        critical: bool,
    },
    Healed {
        target: EntityId,
        amount: f32,
        kind: HealKind,
    },
    Rejected {
        target: EntityId,
        reason: RejectReason,
    },
    Died {
        target: EntityId,
        killer: Option<EntityId>,
        killer_player: Option<PlayerId>,
        at: f64,
        respawn_at: Option<f64>,
    },
    RespawnReady {
        target: EntityId,
    },
    Revived {
        target: EntityId,
    },
}

/// Enter/stay/exit notification for a collider pair. `a < b` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub a: EntityId,
    pub b: EntityId,
    pub phase: ContactPhase,
    /// At least one side is a trigger; no physical response was applied.
    pub trigger: bool,
}

impl CollisionEvent {
    pub fn involves(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    /// The other side of the pair, if `id` is one side.
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}
