//! ECS components for simulation entities.
//!
//! Components are plain data. The few methods here are pure reads of the
//! component's own fields; everything that mutates state lives in systems.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::enums::{DamageType, MotionKind};
use crate::types::{Aabb, EntityId, PlayerId};

/// World-space pose. Mutated by movement and by collision separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// A scripted displacement (dash, charge, knockback) that overrides
/// integrated motion for its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionOverride {
    pub kind: MotionKind,
    /// Simulation time the override began (seconds).
    pub start_time: f64,
    /// Position at `start_time`.
    pub origin: Vec3,
    /// Unit direction of travel.
    pub direction: Vec3,
    /// Total distance covered by the end of the override (meters).
    pub distance: f32,
    /// Duration in seconds. Always > 0.
    pub duration: f64,
}

impl MotionOverride {
    /// Normalized progress in [0, 1].
    pub fn progress(&self, now: f64) -> f32 {
        ((now - self.start_time) / self.duration).clamp(0.0, 1.0) as f32
    }

    /// Eased position at `now`.
    pub fn position_at(&self, now: f64) -> Vec3 {
        self.origin + self.direction * self.distance * self.kind.ease(self.progress(now))
    }

    pub fn is_finished(&self, now: f64) -> bool {
        now >= self.start_time + self.duration
    }
}

/// Kinematic state integrated by the movement system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub velocity: Vec3,
    pub acceleration: Vec3,
    /// Undebuffed horizontal speed cap (m/s).
    pub max_speed: f32,
    /// Horizontal velocity damping per second.
    pub friction: f32,
    /// Downward acceleration while airborne (m/s²). Zero disables gravity.
    pub gravity: f32,
    pub grounded: bool,
    /// Live multiplier derived from debuffs, refreshed by the combat timers.
    pub speed_multiplier: f32,
    /// At most one active override at a time.
    pub motion: Option<MotionOverride>,
}

impl Movement {
    pub fn new(max_speed: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            max_speed,
            friction: 0.0,
            gravity: 0.0,
            grounded: true,
            speed_multiplier: 1.0,
            motion: None,
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MAX_SPEED)
    }
}

/// Collision shape in collider-local space, centred on the collider origin.
/// Cylinders and capsules are Y-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Cylinder { radius: f32, half_height: f32 },
    /// `half_height` is the half length of the inner segment, caps excluded.
    Capsule { radius: f32, half_height: f32 },
}

impl ColliderShape {
    /// World-space bounds when centred at `center`.
    pub fn bounds_at(&self, center: Vec3) -> Aabb {
        match *self {
            ColliderShape::Sphere { radius } => Aabb::around_sphere(center, radius),
            ColliderShape::Box { half_extents } => {
                Aabb::from_center_half_extents(center, half_extents)
            }
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => Aabb::from_center_half_extents(center, Vec3::new(radius, half_height, radius)),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => Aabb::from_center_half_extents(
                center,
                Vec3::new(radius, half_height + radius, radius),
            ),
        }
    }

    /// Radius of the smallest origin-centred sphere enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            ColliderShape::Sphere { radius } => radius,
            ColliderShape::Box { half_extents } => half_extents.length(),
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => (radius * radius + half_height * half_height).sqrt(),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => radius + half_height,
        }
    }
}

/// Collision volume plus the rules that decide how it responds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset of the shape centre from the transform position.
    pub offset: Vec3,
    /// Layers this collider belongs to.
    pub layer: u32,
    /// Layers this collider reacts to.
    pub mask: u32,
    /// Never displaced by separation.
    pub is_static: bool,
    /// Script-driven body: may be displaced, but its velocity is not corrected.
    pub is_kinematic: bool,
    /// Overlaps report notifications only, never a physical response.
    pub is_trigger: bool,
    /// False for remotely-synced replicas that must not be displaced locally.
    pub can_move: bool,
    pub enabled: bool,
    /// Cached world-space bounds, refreshed by the collision system each frame.
    pub bounds: Aabb,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            layer: crate::constants::LAYER_DEFAULT,
            mask: crate::constants::LAYER_ALL,
            is_static: false,
            is_kinematic: false,
            is_trigger: false,
            can_move: true,
            enabled: true,
            bounds: Aabb::default(),
        }
    }

    /// Immovable world geometry.
    pub fn fixed(shape: ColliderShape) -> Self {
        Self {
            is_static: true,
            can_move: false,
            ..Self::new(shape)
        }
    }

    /// Notification-only volume.
    pub fn trigger(shape: ColliderShape) -> Self {
        Self {
            is_trigger: true,
            ..Self::new(shape)
        }
    }

    /// Collider for a server-driven replica: participates in collision but
    /// is never pushed locally.
    pub fn replica(shape: ColliderShape) -> Self {
        Self {
            can_move: false,
            ..Self::new(shape)
        }
    }

    pub fn with_layers(mut self, layer: u32, mask: u32) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn kinematic(mut self) -> Self {
        self.is_kinematic = true;
        self
    }
}

/// Hit points. Invariant: `0 <= current <= max`; once dead, damage is a no-op
/// until revive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Health restored per second while alive.
    pub regen_per_sec: f32,
    /// Invulnerability granted after each applied hit (seconds).
    pub hit_invulnerability: f64,
    /// Damage is rejected while `now < invulnerable_until`.
    pub invulnerable_until: f64,
    pub dead: bool,
    pub death_time: Option<f64>,
    pub last_damage_time: Option<f64>,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            regen_per_sec: 0.0,
            hit_invulnerability: 0.0,
            invulnerable_until: f64::NEG_INFINITY,
            dead: false,
            death_time: None,
            last_damage_time: None,
        }
    }

    pub fn with_regen(mut self, per_sec: f32) -> Self {
        self.regen_per_sec = per_sec;
        self
    }

    /// Fraction of max health remaining, in [0, 1].
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_invulnerable(&self, now: f64) -> bool {
        now < self.invulnerable_until
    }
}

/// Damage-absorbing pool consumed before health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    pub current: f32,
    pub max: f32,
    pub regen_per_sec: f32,
    /// Seconds after the last hit before regeneration resumes.
    pub regen_delay: f64,
    pub last_hit_time: Option<f64>,
}

impl Shield {
    pub fn new(max: f32, regen_per_sec: f32, regen_delay: f64) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            regen_per_sec,
            regen_delay,
            last_hit_time: None,
        }
    }

    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    /// True while the post-hit delay blocks regeneration.
    pub fn in_regen_delay(&self, now: f64) -> bool {
        self.last_hit_time
            .is_some_and(|t| now < t + self.regen_delay)
    }
}

/// Start time and duration of a timed effect. Expiry is evaluated lazily.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEffect {
    pub start: f64,
    pub duration: f64,
}

impl TimedEffect {
    pub fn is_active(&self, now: f64) -> bool {
        now < self.start + self.duration
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.start).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    pub timing: TimedEffect,
    /// Speed multiplier in [0, 1] while active.
    pub multiplier: f32,
}

/// Slow whose penalty decays linearly instead of ending as a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorruptedEffect {
    pub timing: TimedEffect,
    /// Fractional speed penalty at application time.
    pub initial_slow: f32,
    /// Penalty recovered per second.
    pub recovery_rate: f32,
}

impl CorruptedEffect {
    /// Remaining fractional penalty at `now`, never negative.
    pub fn penalty(&self, now: f64) -> f32 {
        (self.initial_slow - self.timing.elapsed(now) as f32 * self.recovery_rate).max(0.0)
    }
}

/// Independent timed debuffs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub frozen: Option<TimedEffect>,
    pub slowed: Option<SlowEffect>,
    pub corrupted: Option<CorruptedEffect>,
}

impl StatusEffects {
    pub fn is_frozen(&self, now: f64) -> bool {
        self.frozen.is_some_and(|f| f.is_active(now))
    }

    pub fn is_slowed(&self, now: f64) -> bool {
        self.slowed.is_some_and(|s| s.timing.is_active(now))
    }

    pub fn is_corrupted(&self, now: f64) -> bool {
        self.corrupted.is_some_and(|c| c.timing.is_active(now))
    }

    pub fn is_empty(&self) -> bool {
        self.frozen.is_none() && self.slowed.is_none() && self.corrupted.is_none()
    }
}

/// Who an entity belongs to. `summoned` marks friendly summons that share
/// their owner's player id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub player: Option<PlayerId>,
    pub owner: Option<EntityId>,
    pub summoned: bool,
}

/// Marks an entity whose health is owned by an external source of truth.
/// Local code may request damage against it but never applies it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AuthorityDelegated;

/// Marks a remotely-synced replica. Its transform is driven by its
/// interpolation buffer, never by local movement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RemoteReplica;

/// Respawn policy for an entity that may come back after death.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Respawn {
    /// Seconds after death before revive is allowed.
    pub delay: f64,
    /// Set on death.
    pub eligible_at: Option<f64>,
    /// Whether eligibility has been announced for the current death.
    pub announced: bool,
}

impl Respawn {
    pub fn after(delay: f64) -> Self {
        Self {
            delay: delay.max(0.0),
            eligible_at: None,
            announced: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageStack {
    pub damage_type: DamageType,
    pub count: u32,
    pub last_hit: f64,
}

/// Per-type damage-over-time stacks accumulated on a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageStacks {
    pub stacks: Vec<DamageStack>,
}

impl DamageStacks {
    pub fn count(&self, damage_type: DamageType) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.damage_type == damage_type)
            .map_or(0, |s| s.count)
    }
}
