//! Combat resolution.
//!
//! Damage and heal requests are queued by gameplay code and resolved once
//! per frame, in this order: timers (regeneration, debuff expiry, stack
//! decay), the damage queue, the heal queue, then death and respawn
//! transitions. Every request ends up applied, forwarded to the authority,
//! or rejected; none are retried.

pub mod authority;
pub mod modifiers;
pub mod status;

use std::collections::VecDeque;

use skirmish_core::components::{
    AuthorityDelegated, DamageStack, DamageStacks, Health, Movement, Ownership, Respawn, Shield,
    StatusEffects,
};
use skirmish_core::config::CombatConfig;
use skirmish_core::enums::{HealKind, RejectReason};
use skirmish_core::events::{CombatEffect, DamageEvent, HealEvent};
use skirmish_core::types::{EntityId, PlayerId};

use crate::world::World;

use authority::{DamageAuthority, LocalAuthority};
use modifiers::{DamageContext, DamageModifier, StandardModifiers};

/// Kill attribution handed to the reward hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillRecord {
    pub victim: EntityId,
    pub killer: Option<EntityId>,
    pub killer_player: Option<PlayerId>,
    pub at: f64,
}

/// Reward bookkeeping (kill credit, experience). Only called for victims
/// whose health this side owns.
pub trait KillHook {
    fn on_kill(&mut self, world: &World, record: &KillRecord);
}

impl<F> KillHook for F
where
    F: FnMut(&World, &KillRecord),
{
    fn on_kill(&mut self, world: &World, record: &KillRecord) {
        self(world, record)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingDeath {
    target: EntityId,
    killer: Option<EntityId>,
    killer_player: Option<PlayerId>,
}

pub struct CombatSystem {
    config: CombatConfig,
    damage_queue: VecDeque<DamageEvent>,
    heal_queue: VecDeque<HealEvent>,
    authority: Box<dyn DamageAuthority>,
    modifier: Box<dyn DamageModifier>,
    kill_hook: Option<Box<dyn KillHook>>,
    pending_deaths: Vec<PendingDeath>,
}

impl CombatSystem {
    /// Local authority and the standard modifier stage seeded with `seed`.
    pub fn new(config: CombatConfig, seed: u64) -> Self {
        let modifier = StandardModifiers::new(&config, seed);
        Self {
            config,
            damage_queue: VecDeque::new(),
            heal_queue: VecDeque::new(),
            authority: Box::new(LocalAuthority),
            modifier: Box::new(modifier),
            kill_hook: None,
            pending_deaths: Vec::new(),
        }
    }

    pub fn set_authority(&mut self, authority: Box<dyn DamageAuthority>) {
        self.authority = authority;
    }

    pub fn set_modifier(&mut self, modifier: Box<dyn DamageModifier>) {
        self.modifier = modifier;
    }

    pub fn set_kill_hook(&mut self, hook: Box<dyn KillHook>) {
        self.kill_hook = Some(hook);
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn queue_damage(&mut self, event: DamageEvent) {
        self.damage_queue.push_back(event);
    }

    pub fn queue_healing(&mut self, event: HealEvent) {
        self.heal_queue.push_back(event);
    }

    pub fn pending_damage(&self) -> usize {
        self.damage_queue.len()
    }

    pub fn pending_heals(&self) -> usize {
        self.heal_queue.len()
    }

    /// One resolution pass. `dt` drives regeneration.
    pub fn resolve(
        &mut self,
        world: &mut World,
        now: f64,
        dt: f64,
        effects: &mut Vec<CombatEffect>,
    ) {
        self.update_timers(world, now, dt);

        while let Some(event) = self.damage_queue.pop_front() {
            self.resolve_damage(world, &event, now, effects);
        }
        while let Some(event) = self.heal_queue.pop_front() {
            resolve_heal(world, &event, effects);
        }

        self.process_deaths(world, now, effects);
        announce_respawns(world, now, effects);
    }

    /// Resolve one damage event immediately, with the same rules as the queue.
    pub fn apply_damage_now(
        &mut self,
        world: &mut World,
        event: &DamageEvent,
        now: f64,
        effects: &mut Vec<CombatEffect>,
    ) {
        self.resolve_damage(world, event, now, effects);
        self.process_deaths(world, now, effects);
    }

    /// Apply damage the authority has already validated. Skips the modifier
    /// stage and the authority branch; the amount is final.
    pub fn apply_confirmed_damage(
        &mut self,
        world: &mut World,
        event: &DamageEvent,
        now: f64,
        effects: &mut Vec<CombatEffect>,
    ) {
        if let Some(reason) = precheck(world, event, now, false) {
            effects.push(CombatEffect::Rejected {
                target: event.target,
                reason,
            });
            return;
        }
        self.apply_local(world, event, event.amount, false, now, effects);
        self.process_deaths(world, now, effects);
    }

    /// Bring a dead entity back at full health. Respawnable entities must
    /// have reached their eligibility time.
    pub fn revive(
        &mut self,
        world: &mut World,
        id: EntityId,
        now: f64,
        effects: &mut Vec<CombatEffect>,
    ) -> bool {
        let Some(mut health) = world.get_mut::<Health>(id) else {
            return false;
        };
        if !health.dead {
            return false;
        }
        if let Some(respawn) = world.get::<Respawn>(id) {
            if respawn.eligible_at.is_some_and(|t| now < t) {
                return false;
            }
        }

        health.current = health.max;
        health.dead = false;
        health.death_time = None;
        health.last_damage_time = None;
        health.invulnerable_until = now + self.config.revive_invulnerability;
        drop(health);

        if let Some(mut shield) = world.get_mut::<Shield>(id) {
            shield.current = shield.max;
            shield.last_hit_time = None;
        }
        if let Some(mut status) = world.get_mut::<StatusEffects>(id) {
            *status = StatusEffects::default();
        }
        if let Some(mut stacks) = world.get_mut::<DamageStacks>(id) {
            stacks.stacks.clear();
        }
        if let Some(mut movement) = world.get_mut::<Movement>(id) {
            movement.speed_multiplier = 1.0;
        }
        if let Some(mut respawn) = world.get_mut::<Respawn>(id) {
            respawn.eligible_at = None;
            respawn.announced = false;
        }

        log::info!("{id} revived at t={now:.2}");
        effects.push(CombatEffect::Revived { target: id });
        true
    }

    fn resolve_damage(
        &mut self,
        world: &mut World,
        event: &DamageEvent,
        now: f64,
        effects: &mut Vec<CombatEffect>,
    ) {
        if let Some(reason) = precheck(world, event, now, true) {
            log::debug!("damage on {} rejected: {reason:?}", event.target);
            effects.push(CombatEffect::Rejected {
                target: event.target,
                reason,
            });
            return;
        }

        let ctx = DamageContext {
            target: event.target,
            source: event.source,
            source_player: event.source_player,
            damage_type: event.damage_type,
            base: event.amount,
            stacks: event
                .damage_type
                .and_then(|t| world.get::<DamageStacks>(event.target).map(|s| s.count(t)))
                .unwrap_or(0),
        };
        let modified = self.modifier.modify(&ctx);
        record_stack(world, event, now);

        if self.authority.is_delegated(world, event.target) {
            self.authority
                .forward(event.target, modified.amount, event.source_player);
            log::debug!(
                "forwarded {:.1} damage on {} to authority",
                modified.amount,
                event.target
            );
            effects.push(CombatEffect::DamageForwarded {
                target: event.target,
                amount: modified.amount,
                source_player: event.source_player,
            });
            effects.push(CombatEffect::DamageNumber {
                target: event.target,
                amount: modified.amount,
                critical: modified.critical,
            });
            return;
        }

        if world.has::<AuthorityDelegated>(event.target) {
            // Caller bug: a delegated target reached the local path through
            // an authority that does not route it. Not re-routed.
            log::error!(
                "delegated target {} reached local damage path",
                event.target
            );
            debug_assert!(false, "delegated target {} applied locally", event.target);
        }

        self.apply_local(world, event, modified.amount, modified.critical, now, effects);
    }

    /// Shield first, then health, clamped at zero. A shield inside its
    /// post-hit regen delay does not absorb; only a hit it absorbs restarts
    /// the delay.
    fn apply_local(
        &mut self,
        world: &mut World,
        event: &DamageEvent,
        amount: f32,
        critical: bool,
        now: f64,
        effects: &mut Vec<CombatEffect>,
    ) {
        let mut remaining = amount.max(0.0);
        let mut absorbed = 0.0;
        if let Some(mut shield) = world.get_mut::<Shield>(event.target) {
            if shield.current > 0.0 && !shield.in_regen_delay(now) {
                absorbed = remaining.min(shield.current);
                shield.current -= absorbed;
                remaining -= absorbed;
                shield.last_hit_time = Some(now);
            }
        }

        let Some(mut health) = world.get_mut::<Health>(event.target) else {
            return;
        };
        health.current = (health.current - remaining).clamp(0.0, health.max);
        health.last_damage_time = Some(now);
        if health.hit_invulnerability > 0.0 {
            health.invulnerable_until = now + health.hit_invulnerability;
        }
        let health_after = health.current;
        drop(health);

        if health_after <= 0.0 {
            self.pending_deaths.push(PendingDeath {
                target: event.target,
                killer: event.source,
                killer_player: event.source_player,
            });
        }

        effects.push(CombatEffect::DamageApplied {
            target: event.target,
            source: event.source,
            amount,
            shield_absorbed: absorbed,
            health_after,
            critical,
        });
    }

    fn process_deaths(&mut self, world: &mut World, now: f64, effects: &mut Vec<CombatEffect>) {
        for death in std::mem::take(&mut self.pending_deaths) {
            let Some(mut health) = world.get_mut::<Health>(death.target) else {
                continue;
            };
            if health.dead {
                continue;
            }
            health.dead = true;
            health.current = 0.0;
            health.death_time = Some(now);
            drop(health);

            let respawn_at = world.get_mut::<Respawn>(death.target).map(|mut r| {
                let at = now + r.delay;
                r.eligible_at = Some(at);
                r.announced = false;
                at
            });
            if let Some(mut movement) = world.get_mut::<Movement>(death.target) {
                movement.velocity = glam::Vec3::ZERO;
                movement.acceleration = glam::Vec3::ZERO;
                movement.motion = None;
            }

            log::info!(
                "{} died at t={now:.2} (killer {:?}, respawn {:?})",
                death.target,
                death.killer,
                respawn_at
            );
            effects.push(CombatEffect::Died {
                target: death.target,
                killer: death.killer,
                killer_player: death.killer_player,
                at: now,
                respawn_at,
            });

            if !self.authority.is_delegated(world, death.target) {
                if let Some(hook) = self.kill_hook.as_mut() {
                    hook.on_kill(
                        world,
                        &KillRecord {
                            victim: death.target,
                            killer: death.killer,
                            killer_player: death.killer_player,
                            at: now,
                        },
                    );
                }
            }
        }
    }

    fn update_timers(&mut self, world: &mut World, now: f64, dt: f64) {
        let dt = dt.max(0.0) as f32;

        for (_e, health) in world.ecs_mut().query_mut::<&mut Health>() {
            if !health.dead && health.current > 0.0 && health.regen_per_sec > 0.0 {
                health.current = (health.current + health.regen_per_sec * dt).min(health.max);
            }
        }

        for (_e, (shield, health)) in world
            .ecs_mut()
            .query_mut::<(&mut Shield, Option<&Health>)>()
        {
            let alive = health.map_or(true, |h| !h.dead);
            if alive && shield.regen_per_sec > 0.0 && !shield.in_regen_delay(now) {
                shield.current = (shield.current + shield.regen_per_sec * dt).min(shield.max);
            }
        }

        for (_e, debuffs) in world.ecs_mut().query_mut::<&mut StatusEffects>() {
            status::clear_expired(debuffs, now);
        }

        for (_e, (movement, debuffs)) in world
            .ecs_mut()
            .query_mut::<(&mut Movement, Option<&StatusEffects>)>()
        {
            movement.speed_multiplier = debuffs.map_or(1.0, |d| status::speed_multiplier(d, now));
        }

        let window = self.config.dot_stack_window;
        for (_e, stacks) in world.ecs_mut().query_mut::<&mut DamageStacks>() {
            stacks.stacks.retain(|s| now - s.last_hit < window);
        }
    }
}

/// Rejection checks shared by every damage path. `team_checks` is false for
/// server-confirmed damage, which the authority has already vetted.
fn precheck(
    world: &World,
    event: &DamageEvent,
    now: f64,
    team_checks: bool,
) -> Option<RejectReason> {
    let Some(health) = world.health(event.target) else {
        return Some(RejectReason::MissingTarget);
    };
    if !(event.amount > 0.0) || !event.amount.is_finite() {
        return Some(RejectReason::NonPositiveAmount);
    }
    if health.dead || health.current <= 0.0 {
        return Some(RejectReason::TargetDead);
    }
    if !team_checks {
        return None;
    }
    if event.source == Some(event.target) {
        return Some(RejectReason::SelfDamage);
    }
    if same_team(world, event) {
        return Some(RejectReason::SameTeam);
    }
    if health.is_invulnerable(now) {
        return Some(RejectReason::Invulnerable);
    }
    None
}

/// Friendly-summon check: a summon never takes damage from its owner or its
/// owner's player, and never deals damage to them.
fn same_team(world: &World, event: &DamageEvent) -> bool {
    let target = world
        .get::<Ownership>(event.target)
        .map(|o| *o)
        .unwrap_or_default();
    let source = event
        .source
        .and_then(|s| world.get::<Ownership>(s).map(|o| *o));
    let source_player = event.source_player.or(source.and_then(|o| o.player));

    if target.summoned {
        if target.owner.is_some() && target.owner == event.source {
            return true;
        }
        if target.player.is_some() && target.player == source_player {
            return true;
        }
    }
    if let Some(source) = source.filter(|o| o.summoned) {
        if source.owner == Some(event.target) {
            return true;
        }
        if source.player.is_some() && source.player == target.player {
            return true;
        }
    }
    false
}

fn record_stack(world: &mut World, event: &DamageEvent, now: f64) {
    let Some(damage_type) = event.damage_type else {
        return;
    };
    if let Some(mut stacks) = world.get_mut::<DamageStacks>(event.target) {
        match stacks.stacks.iter_mut().find(|s| s.damage_type == damage_type) {
            Some(stack) => {
                stack.count += 1;
                stack.last_hit = now;
            }
            None => stacks.stacks.push(DamageStack {
                damage_type,
                count: 1,
                last_hit: now,
            }),
        }
        return;
    }
    world.insert(
        event.target,
        DamageStacks {
            stacks: vec![DamageStack {
                damage_type,
                count: 1,
                last_hit: now,
            }],
        },
    );
}

fn resolve_heal(world: &mut World, event: &HealEvent, effects: &mut Vec<CombatEffect>) {
    let reject = |reason| CombatEffect::Rejected {
        target: event.target,
        reason,
    };
    let Some(health) = world.health(event.target) else {
        effects.push(reject(RejectReason::MissingTarget));
        return;
    };
    if !(event.amount > 0.0) || !event.amount.is_finite() {
        effects.push(reject(RejectReason::NonPositiveAmount));
        return;
    }
    if health.dead || health.current <= 0.0 {
        effects.push(reject(RejectReason::TargetDead));
        return;
    }

    let applied = match event.kind {
        HealKind::Health => {
            let Some(mut health) = world.get_mut::<Health>(event.target) else {
                return;
            };
            let before = health.current;
            health.current = (health.current + event.amount).min(health.max);
            health.current - before
        }
        HealKind::Shield => {
            let Some(mut shield) = world.get_mut::<Shield>(event.target) else {
                effects.push(reject(RejectReason::NoShield));
                return;
            };
            let before = shield.current;
            shield.current = (shield.current + event.amount).min(shield.max);
            shield.current - before
        }
    };
    effects.push(CombatEffect::Healed {
        target: event.target,
        amount: applied,
        kind: event.kind,
    });
}

fn announce_respawns(world: &mut World, now: f64, effects: &mut Vec<CombatEffect>) {
    let mut ready: Vec<EntityId> = Vec::new();
    for (entity, (health, respawn)) in world.ecs_mut().query_mut::<(&Health, &mut Respawn)>() {
        if health.dead && !respawn.announced && respawn.eligible_at.is_some_and(|t| now >= t) {
            respawn.announced = true;
            ready.push(crate::world::id_of(entity));
        }
    }
    ready.sort_unstable();
    effects.extend(ready.into_iter().map(|target| CombatEffect::RespawnReady { target }));
}

#[cfg(test)]
mod tests;
