//! Simulation engine: the public entry point of the crate.
//!
//! `SimulationEngine` owns the simulation state and the scheduler, exposes
//! the gameplay, network and renderer entry points, and advances the world
//! one variable-rate frame at a time. Completely headless.

use glam::{Quat, Vec3};
use hecs::DynamicBundle;
use serde::Serialize;

use skirmish_core::components::{RemoteReplica, Transform};
use skirmish_core::config::SimConfig;
use skirmish_core::constants::MAX_TIME_SCALE;
use skirmish_core::enums::{DamageType, HealKind, MotionKind};
use skirmish_core::events::{CollisionEvent, CombatEffect, DamageEvent, HealEvent};
use skirmish_core::state::WorldSnapshot;
use skirmish_core::types::{EntityId, PlayerId, SimTime};

use crate::combat::authority::DamageAuthority;
use crate::combat::modifiers::DamageModifier;
use crate::combat::{status, KillHook};
use crate::interpolation::InterpolationBuffer;
use crate::schedule::{Phase, Scheduler, System};
use crate::spatial::SpatialGrid;
use crate::state::SimState;
use crate::systems;
use crate::world::World;

/// What happened during one frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameReport {
    pub time: SimTime,
    pub fixed_steps: u32,
    pub collisions: Vec<CollisionEvent>,
    pub combat: Vec<CombatEffect>,
}

pub struct SimulationEngine {
    state: SimState,
    scheduler: Scheduler,
    time_scale: f64,
}

impl SimulationEngine {
    /// Local authority, standard modifiers, built-in systems registered.
    /// An invalid config is logged and replaced by the defaults, keeping
    /// its seed; use [`SimConfig::validate`] up front to reject it instead.
    pub fn new(config: SimConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::error!("invalid simulation config, using defaults: {e}");
                SimConfig {
                    seed: config.seed,
                    ..SimConfig::default()
                }
            }
        };
        let mut scheduler = Scheduler::new(
            config.schedule.fixed_dt,
            config.schedule.max_fixed_steps,
        );
        scheduler.add(Box::new(systems::movement::MovementSystem));
        scheduler.add(Box::new(systems::replication::ReplicaSyncSystem));
        scheduler.add(Box::new(systems::collision::SeparationSystem));
        scheduler.add(Box::new(systems::collision::CollisionSystem::new()));
        scheduler.add(Box::new(systems::combat_pass::CombatPass));
        scheduler.add(Box::new(systems::cleanup::CleanupSystem));

        let time_scale = config.time_scale.clamp(0.0, MAX_TIME_SCALE);
        Self {
            state: SimState::new(config),
            scheduler,
            time_scale,
        }
    }

    /// Route damage through an external authority. Decided once, up front.
    pub fn with_authority(mut self, authority: impl DamageAuthority + 'static) -> Self {
        self.state.combat.set_authority(Box::new(authority));
        self
    }

    pub fn with_modifier(mut self, modifier: impl DamageModifier + 'static) -> Self {
        self.state.combat.set_modifier(Box::new(modifier));
        self
    }

    pub fn with_kill_hook(mut self, hook: impl KillHook + 'static) -> Self {
        self.state.combat.set_kill_hook(Box::new(hook));
        self
    }

    /// Register a gameplay system. Systems at the default priority run
    /// between collision and combat resolution.
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.scheduler.add(system);
    }

    pub fn system_order(&self, phase: Phase) -> Vec<&str> {
        self.scheduler.order(phase)
    }

    /// Advance by one variable-rate frame of `dt` real seconds.
    pub fn frame(&mut self, dt: f64) -> FrameReport {
        let dt = if dt.is_finite() { dt.max(0.0) * self.time_scale } else { 0.0 };
        self.state.time.advance_frame(dt);
        let fixed_steps = self.scheduler.run_frame(&mut self.state, dt);

        FrameReport {
            time: self.state.time,
            fixed_steps,
            collisions: std::mem::take(&mut self.state.collision_events),
            combat: std::mem::take(&mut self.state.effects),
        }
    }

    pub fn time(&self) -> SimTime {
        self.state.time
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.clamp(0.0, MAX_TIME_SCALE);
    }

    pub fn config(&self) -> &SimConfig {
        &self.state.config
    }

    pub fn world(&self) -> &World {
        &self.state.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.state.world
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.state.grid
    }

    pub fn spawn(&mut self, components: impl DynamicBundle) -> EntityId {
        self.state.world.spawn(components)
    }

    /// Remove from the spatial index, then from the store.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.state.despawn(id)
    }

    // ---- Gameplay boundary ----

    pub fn queue_damage(
        &mut self,
        target: EntityId,
        amount: f32,
        source: Option<EntityId>,
        damage_type: Option<DamageType>,
        source_player: Option<PlayerId>,
    ) {
        let event = DamageEvent {
            target,
            amount,
            source,
            damage_type,
            source_player,
            queued_at: self.state.now(),
        };
        self.state.combat.queue_damage(event);
    }

    pub fn queue_healing(&mut self, target: EntityId, amount: f32, source: Option<EntityId>) {
        self.queue_heal(target, amount, source, HealKind::Health);
    }

    pub fn queue_shield_healing(
        &mut self,
        target: EntityId,
        amount: f32,
        source: Option<EntityId>,
    ) {
        self.queue_heal(target, amount, source, HealKind::Shield);
    }

    /// Same-tick damage, resolved by the queued rules. Returns its effects.
    pub fn apply_damage_now(
        &mut self,
        target: EntityId,
        amount: f32,
        source: Option<EntityId>,
        damage_type: Option<DamageType>,
        source_player: Option<PlayerId>,
    ) -> Vec<CombatEffect> {
        let now = self.state.now();
        let event = DamageEvent {
            target,
            amount,
            source,
            damage_type,
            source_player,
            queued_at: now,
        };
        let mut effects = Vec::new();
        self.state
            .combat
            .apply_damage_now(&mut self.state.world, &event, now, &mut effects);
        effects
    }

    // ---- Network boundary ----

    /// Damage the authority has validated; applied locally as-is.
    pub fn apply_confirmed_damage(
        &mut self,
        target: EntityId,
        amount: f32,
        source: Option<EntityId>,
        source_player: Option<PlayerId>,
    ) -> Vec<CombatEffect> {
        let now = self.state.now();
        let event = DamageEvent {
            target,
            amount,
            source,
            damage_type: None,
            source_player,
            queued_at: now,
        };
        let mut effects = Vec::new();
        self.state
            .combat
            .apply_confirmed_damage(&mut self.state.world, &event, now, &mut effects);
        effects
    }

    /// Buffer a server state for a remote entity. The first call turns the
    /// entity into a replica. Returns false for stale ids and stale samples.
    pub fn add_server_state(
        &mut self,
        id: EntityId,
        position: Vec3,
        rotation: Quat,
        timestamp: f64,
    ) -> bool {
        let world = &mut self.state.world;
        if !world.contains(id) {
            return false;
        }
        if let Some(mut buffer) = world.get_mut::<InterpolationBuffer>(id) {
            return buffer.add_server_state(position, rotation, timestamp);
        }
        let mut buffer = InterpolationBuffer::from_config(&self.state.config.interpolation);
        let kept = buffer.add_server_state(position, rotation, timestamp);
        world.insert(id, buffer);
        world.insert(id, RemoteReplica);
        kept
    }

    // ---- Renderer boundary ----

    /// Pose to draw `id` at: interpolated for replicas, raw otherwise.
    pub fn render_pose(&self, id: EntityId) -> Option<Transform> {
        systems::snapshot::render_pose(&self.state.world, id, self.state.now())
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        systems::snapshot::build_snapshot(&self.state.world, &self.state.time)
    }

    // ---- Debuffs and motion ----

    pub fn freeze(&mut self, id: EntityId, duration: f64) -> bool {
        let now = self.state.now();
        status::freeze(&mut self.state.world, id, now, duration)
    }

    pub fn slow(&mut self, id: EntityId, duration: f64, multiplier: f32) -> bool {
        let now = self.state.now();
        status::slow(&mut self.state.world, id, now, duration, multiplier)
    }

    /// Corrupted debuff using the configured initial slow and recovery rate.
    pub fn apply_corrupted(&mut self, id: EntityId, duration: f64) -> bool {
        let now = self.state.now();
        let combat = &self.state.config.combat;
        status::apply_corrupted(
            &mut self.state.world,
            id,
            now,
            duration,
            combat.corrupted_initial_slow,
            combat.corrupted_recovery_rate,
        )
    }

    pub fn effective_max_speed(&self, id: EntityId) -> Option<f32> {
        status::effective_max_speed(&self.state.world, id, self.state.now())
    }

    pub fn start_motion(
        &mut self,
        id: EntityId,
        kind: MotionKind,
        direction: Vec3,
        distance: f32,
        duration: f64,
    ) -> bool {
        let now = self.state.now();
        systems::movement::start_motion(
            &mut self.state.world,
            id,
            kind,
            direction,
            distance,
            duration,
            now,
        )
    }

    /// Revive a dead entity. The `Revived` effect is reported next frame.
    pub fn revive(&mut self, id: EntityId) -> bool {
        let now = self.state.now();
        self.state
            .combat
            .revive(&mut self.state.world, id, now, &mut self.state.effects)
    }

    fn queue_heal(&mut self, target: EntityId, amount: f32, source: Option<EntityId>, kind: HealKind) {
        let event = HealEvent {
            target,
            amount,
            source,
            kind,
            queued_at: self.state.now(),
        };
        self.state.combat.queue_healing(event);
    }
}
