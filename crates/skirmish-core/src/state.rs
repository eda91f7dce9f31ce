//! World snapshot: the read-only view handed to the renderer each frame.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::enums::EntityKind;
use crate::types::{EntityId, SimTime};

/// Complete render-facing state after a frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time: SimTime,
    pub entities: Vec<EntityView>,
}

/// One visible entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Interpolated pose for remote replicas, raw transform otherwise.
    pub position: Vec3,
    pub rotation: Quat,
    /// None for entities without Health.
    pub health_ratio: Option<f32>,
    pub shield_ratio: Option<f32>,
    pub dead: bool,
    pub frozen: bool,
    pub slowed: bool,
    pub corrupted: bool,
    /// Live speed cap after debuffs (m/s), for entities with Movement.
    pub effective_max_speed: Option<f32>,
}
