//! Tests for damage/heal resolution, authority routing, death and revive.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;

use skirmish_core::components::*;
use skirmish_core::config::CombatConfig;
use skirmish_core::enums::*;
use skirmish_core::events::{CombatEffect, DamageEvent, HealEvent};
use skirmish_core::types::{EntityId, PlayerId};

use super::authority::CallbackAuthority;
use super::modifiers::NoModifiers;
use super::*;

fn combat() -> CombatSystem {
    let mut combat = CombatSystem::new(CombatConfig::default(), 1);
    combat.set_modifier(Box::new(NoModifiers));
    combat
}

fn hit(target: EntityId, amount: f32) -> DamageEvent {
    DamageEvent {
        target,
        amount,
        source: None,
        damage_type: None,
        source_player: None,
        queued_at: 0.0,
    }
}

fn heal(target: EntityId, amount: f32, kind: HealKind) -> HealEvent {
    HealEvent {
        target,
        amount,
        source: None,
        kind,
        queued_at: 0.0,
    }
}

fn resolve(combat: &mut CombatSystem, world: &mut World, now: f64) -> Vec<CombatEffect> {
    let mut effects = Vec::new();
    combat.resolve(world, now, 0.0, &mut effects);
    effects
}

fn rejected(effects: &[CombatEffect]) -> Vec<RejectReason> {
    effects
        .iter()
        .filter_map(|e| match e {
            CombatEffect::Rejected { reason, .. } => Some(*reason),
            _ => None,
        })
        .collect()
}

fn deaths(effects: &[CombatEffect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, CombatEffect::Died { .. }))
        .count()
}

// ---- Damage ----

#[test]
fn test_thirty_then_eighty_kills_and_schedules_respawn() {
    let mut world = World::new();
    let mut combat = combat();
    let a = world.spawn((Health::new(100.0), Respawn::after(5.0)));

    combat.queue_damage(hit(a, 30.0));
    resolve(&mut combat, &mut world, 1.0);
    let h = world.health(a).unwrap();
    assert_eq!(h.current, 70.0);
    assert!(!h.dead);

    combat.queue_damage(hit(a, 80.0));
    let effects = resolve(&mut combat, &mut world, 2.0);
    let h = world.health(a).unwrap();
    assert_eq!(h.current, 0.0);
    assert!(h.dead);
    assert_eq!(h.death_time, Some(2.0));
    assert_eq!(world.get::<Respawn>(a).unwrap().eligible_at, Some(7.0));
    assert!(effects.iter().any(|e| matches!(
        e,
        CombatEffect::Died { target, respawn_at: Some(at), .. } if *target == a && *at == 7.0
    )));
}

#[test]
fn test_shield_absorbs_before_health() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(100.0), Shield::new(50.0, 0.0, 2.0)));

    combat.queue_damage(hit(id, 20.0));
    resolve(&mut combat, &mut world, 0.0);
    assert_eq!(world.health(id).unwrap().current, 100.0);
    assert_eq!(world.get::<Shield>(id).unwrap().current, 30.0);

    // Inside the post-hit delay the shield is bypassed.
    combat.queue_damage(hit(id, 10.0));
    let effects = resolve(&mut combat, &mut world, 0.5);
    assert_eq!(world.get::<Shield>(id).unwrap().current, 30.0);
    assert_eq!(world.health(id).unwrap().current, 90.0);
    assert!(effects.iter().any(|e| matches!(
        e,
        CombatEffect::DamageApplied { shield_absorbed, health_after, .. }
            if *shield_absorbed == 0.0 && *health_after == 90.0
    )));

    // Bypassing hits do not extend the delay.
    combat.queue_damage(hit(id, 45.0));
    let effects = resolve(&mut combat, &mut world, 2.0);
    assert_eq!(world.get::<Shield>(id).unwrap().current, 0.0);
    assert_eq!(world.health(id).unwrap().current, 75.0);
    assert!(effects.iter().any(|e| matches!(
        e,
        CombatEffect::DamageApplied { shield_absorbed, health_after, .. }
            if *shield_absorbed == 30.0 && *health_after == 75.0
    )));
}

#[test]
fn test_damage_on_dead_target_is_noop() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(10.0),));

    combat.queue_damage(hit(id, 50.0));
    let first = resolve(&mut combat, &mut world, 0.0);
    assert_eq!(deaths(&first), 1);

    combat.queue_damage(hit(id, 50.0));
    let second = resolve(&mut combat, &mut world, 1.0);
    assert_eq!(deaths(&second), 0);
    assert_eq!(rejected(&second), vec![RejectReason::TargetDead]);
    assert_eq!(world.health(id).unwrap().death_time, Some(0.0));
}

#[test]
fn test_two_lethal_hits_same_frame_die_once() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(10.0),));
    combat.queue_damage(hit(id, 50.0));
    combat.queue_damage(hit(id, 50.0));
    let effects = resolve(&mut combat, &mut world, 0.0);
    assert_eq!(deaths(&effects), 1);
    assert_eq!(rejected(&effects), vec![RejectReason::TargetDead]);
}

#[test]
fn test_invalid_requests_rejected() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(10.0),));
    let prop = world.spawn((Transform::default(),));

    combat.queue_damage(hit(id, 0.0));
    combat.queue_damage(hit(id, -5.0));
    combat.queue_damage(hit(prop, 5.0));
    combat.queue_damage(hit(EntityId(u64::MAX), 5.0));
    combat.queue_damage(DamageEvent {
        source: Some(id),
        ..hit(id, 5.0)
    });
    let effects = resolve(&mut combat, &mut world, 0.0);
    assert_eq!(
        rejected(&effects),
        vec![
            RejectReason::NonPositiveAmount,
            RejectReason::NonPositiveAmount,
            RejectReason::MissingTarget,
            RejectReason::MissingTarget,
            RejectReason::SelfDamage,
        ]
    );
    assert_eq!(world.health(id).unwrap().current, 10.0);
}

#[test]
fn test_friendly_summon_damage_rejected() {
    let mut world = World::new();
    let mut combat = combat();
    let p1 = PlayerId(1);
    let owner = world.spawn((
        Health::new(100.0),
        Ownership {
            player: Some(p1),
            ..Default::default()
        },
    ));
    let summon = world.spawn((
        Health::new(30.0),
        Ownership {
            player: Some(p1),
            owner: Some(owner),
            summoned: true,
        },
    ));
    let enemy = world.spawn((Health::new(30.0),));

    // Owner hits own summon, summon hits owner, same player's projectile.
    combat.queue_damage(DamageEvent {
        source: Some(owner),
        ..hit(summon, 5.0)
    });
    combat.queue_damage(DamageEvent {
        source: Some(summon),
        ..hit(owner, 5.0)
    });
    combat.queue_damage(DamageEvent {
        source_player: Some(p1),
        ..hit(summon, 5.0)
    });
    // Summon hitting an enemy is fine.
    combat.queue_damage(DamageEvent {
        source: Some(summon),
        ..hit(enemy, 5.0)
    });
    let effects = resolve(&mut combat, &mut world, 0.0);
    assert_eq!(rejected(&effects), vec![RejectReason::SameTeam; 3]);
    assert_eq!(world.health(summon).unwrap().current, 30.0);
    assert_eq!(world.health(owner).unwrap().current, 100.0);
    assert_eq!(world.health(enemy).unwrap().current, 25.0);
}

#[test]
fn test_hit_invulnerability_window() {
    let mut world = World::new();
    let mut combat = combat();
    let mut health = Health::new(100.0);
    health.hit_invulnerability = 0.5;
    let id = world.spawn((health,));

    combat.queue_damage(hit(id, 10.0));
    resolve(&mut combat, &mut world, 1.0);
    combat.queue_damage(hit(id, 10.0));
    let effects = resolve(&mut combat, &mut world, 1.2);
    assert_eq!(rejected(&effects), vec![RejectReason::Invulnerable]);
    combat.queue_damage(hit(id, 10.0));
    resolve(&mut combat, &mut world, 1.5);
    assert_eq!(world.health(id).unwrap().current, 80.0);
}

#[test]
fn test_damage_resolves_before_healing() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(100.0),));

    // Heal queued first still lands after the damage.
    combat.queue_healing(heal(id, 50.0, HealKind::Health));
    combat.queue_damage(hit(id, 60.0));
    resolve(&mut combat, &mut world, 0.0);
    assert_eq!(world.health(id).unwrap().current, 90.0);
}

#[test]
fn test_health_bounds_hold() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(40.0).with_regen(5.0),));
    let amounts = [15.0, -3.0, 200.0, 0.5, 33.0, 7.0];
    for (i, amount) in amounts.iter().enumerate() {
        if i % 2 == 0 {
            combat.queue_damage(hit(id, *amount));
        } else {
            combat.queue_healing(heal(id, *amount * 10.0, HealKind::Health));
        }
        let mut effects = Vec::new();
        combat.resolve(&mut world, i as f64, 1.0, &mut effects);
        let h = world.health(id).unwrap();
        assert!(h.current >= 0.0 && h.current <= h.max, "{h:?}");
    }
}

// ---- Healing ----

#[test]
fn test_heals_clamp_and_reject() {
    let mut world = World::new();
    let mut combat = combat();
    let mut health = Health::new(100.0);
    health.current = 90.0;
    let id = world.spawn((health,));
    let bare = world.spawn((Health::new(10.0),));

    combat.queue_healing(heal(id, 25.0, HealKind::Health));
    combat.queue_healing(heal(id, 0.0, HealKind::Health));
    combat.queue_healing(heal(bare, 5.0, HealKind::Shield));
    let effects = resolve(&mut combat, &mut world, 0.0);
    assert_eq!(world.health(id).unwrap().current, 100.0);
    assert!(effects.iter().any(|e| matches!(
        e,
        CombatEffect::Healed { amount, .. } if *amount == 10.0
    )));
    assert_eq!(
        rejected(&effects),
        vec![RejectReason::NonPositiveAmount, RejectReason::NoShield]
    );
}

#[test]
fn test_shield_heal_and_dead_heal() {
    let mut world = World::new();
    let mut combat = combat();
    let mut shield = Shield::new(50.0, 0.0, 0.0);
    shield.current = 10.0;
    let id = world.spawn((Health::new(100.0), shield));

    combat.queue_healing(heal(id, 15.0, HealKind::Shield));
    resolve(&mut combat, &mut world, 0.0);
    assert_eq!(world.get::<Shield>(id).unwrap().current, 25.0);

    world.get_mut::<Health>(id).unwrap().dead = true;
    combat.queue_healing(heal(id, 15.0, HealKind::Health));
    let effects = resolve(&mut combat, &mut world, 0.0);
    assert_eq!(rejected(&effects), vec![RejectReason::TargetDead]);
}

// ---- Timers ----

#[test]
fn test_shield_regen_waits_for_delay() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(100.0), Shield::new(50.0, 10.0, 2.0)));

    combat.queue_damage(hit(id, 30.0));
    let mut effects = Vec::new();
    combat.resolve(&mut world, 0.0, 0.0, &mut effects);
    combat.resolve(&mut world, 1.0, 1.0, &mut effects);
    assert_eq!(world.get::<Shield>(id).unwrap().current, 20.0);
    combat.resolve(&mut world, 3.0, 1.0, &mut effects);
    assert_abs_diff_eq!(world.get::<Shield>(id).unwrap().current, 30.0, epsilon = 1e-4);
}

#[test]
fn test_dot_stacks_grow_and_expire() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(1000.0),));
    for _ in 0..3 {
        combat.queue_damage(DamageEvent {
            damage_type: Some(DamageType::Poison),
            ..hit(id, 1.0)
        });
    }
    resolve(&mut combat, &mut world, 0.0);
    assert_eq!(world.get::<DamageStacks>(id).unwrap().count(DamageType::Poison), 3);

    let window = combat.config().dot_stack_window;
    resolve(&mut combat, &mut world, window + 0.1);
    assert_eq!(world.get::<DamageStacks>(id).unwrap().count(DamageType::Poison), 0);
}

#[test]
fn test_stack_bonus_applies_to_later_hits() {
    let mut world = World::new();
    let mut combat = CombatSystem::new(CombatConfig::default(), 1);
    let id = world.spawn((Health::new(1000.0),));
    let poison = |amount| DamageEvent {
        damage_type: Some(DamageType::Poison),
        ..hit(id, amount)
    };
    combat.queue_damage(poison(10.0));
    combat.queue_damage(poison(10.0));
    resolve(&mut combat, &mut world, 0.0);
    // 10 + 10 * 1.1
    assert_abs_diff_eq!(world.health(id).unwrap().current, 979.0, epsilon = 1e-3);
}

#[test]
fn test_movement_multiplier_refreshed_from_debuffs() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(10.0), Movement::new(5.0)));
    status::slow(&mut world, id, 0.0, 1.0, 0.5);
    resolve(&mut combat, &mut world, 0.5);
    assert_eq!(world.get::<Movement>(id).unwrap().speed_multiplier, 0.5);
    resolve(&mut combat, &mut world, 1.5);
    assert_eq!(world.get::<Movement>(id).unwrap().speed_multiplier, 1.0);
    assert!(world.get::<StatusEffects>(id).unwrap().is_empty());
}

// ---- Authority ----

#[test]
fn test_delegated_target_forwards_without_mutation() {
    let mut world = World::new();
    let calls: Rc<RefCell<Vec<(EntityId, f32, Option<PlayerId>)>>> = Rc::default();
    let sink = calls.clone();

    let config = CombatConfig {
        bonus_percent: 50.0,
        ..Default::default()
    };
    let mut combat = CombatSystem::new(config, 3);
    combat.set_authority(Box::new(CallbackAuthority::new(move |t, a, p| {
        sink.borrow_mut().push((t, a, p))
    })));

    let remote = world.spawn((Health::new(100.0), AuthorityDelegated));
    combat.queue_damage(DamageEvent {
        source_player: Some(PlayerId(4)),
        ..hit(remote, 20.0)
    });
    let effects = resolve(&mut combat, &mut world, 0.0);

    assert_eq!(world.health(remote).unwrap().current, 100.0);
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, remote);
    assert_abs_diff_eq!(calls[0].1, 30.0, epsilon = 1e-4);
    assert_eq!(calls[0].2, Some(PlayerId(4)));
    assert!(effects
        .iter()
        .any(|e| matches!(e, CombatEffect::DamageNumber { target, .. } if *target == remote)));
}

#[test]
fn test_delegated_dead_target_not_forwarded() {
    let mut world = World::new();
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    let mut combat = combat();
    combat.set_authority(Box::new(CallbackAuthority::new(move |_, _, _| {
        *sink.borrow_mut() += 1
    })));
    let mut health = Health::new(10.0);
    health.dead = true;
    let remote = world.spawn((health, AuthorityDelegated));
    combat.queue_damage(hit(remote, 5.0));
    resolve(&mut combat, &mut world, 0.0);
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn test_confirmed_damage_applies_to_delegated_target() {
    let mut world = World::new();
    let mut combat = combat();
    combat.set_authority(Box::new(CallbackAuthority::new(|_, _, _| {})));
    let kills = Rc::new(RefCell::new(0));
    let sink = kills.clone();
    combat.set_kill_hook(Box::new(move |_: &World, _: &KillRecord| {
        *sink.borrow_mut() += 1
    }));

    let remote = world.spawn((Health::new(50.0), AuthorityDelegated));
    let mut effects = Vec::new();
    combat.apply_confirmed_damage(&mut world, &hit(remote, 20.0), 0.0, &mut effects);
    assert_eq!(world.health(remote).unwrap().current, 30.0);

    combat.apply_confirmed_damage(&mut world, &hit(remote, 40.0), 0.0, &mut effects);
    assert!(world.is_dead(remote));
    assert_eq!(deaths(&effects), 1);
    // The authority owns reward bookkeeping for its entities.
    assert_eq!(*kills.borrow(), 0);
}

#[test]
fn test_kill_hook_receives_attribution() {
    let mut world = World::new();
    let mut combat = combat();
    let records: Rc<RefCell<Vec<KillRecord>>> = Rc::default();
    let sink = records.clone();
    combat.set_kill_hook(Box::new(move |_: &World, r: &KillRecord| {
        sink.borrow_mut().push(*r)
    }));

    let killer = world.spawn((Health::new(10.0),));
    let victim = world.spawn((Health::new(10.0),));
    let mut effects = Vec::new();
    combat.apply_damage_now(
        &mut world,
        &DamageEvent {
            source: Some(killer),
            source_player: Some(PlayerId(2)),
            ..hit(victim, 99.0)
        },
        4.0,
        &mut effects,
    );
    let records = records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].victim, victim);
    assert_eq!(records[0].killer, Some(killer));
    assert_eq!(records[0].killer_player, Some(PlayerId(2)));
    assert_eq!(records[0].at, 4.0);
}

// ---- Respawn / revive ----

#[test]
fn test_revive_waits_for_eligibility() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((
        Health::new(100.0),
        Shield::new(20.0, 0.0, 0.0),
        Respawn::after(3.0),
    ));
    let mut effects = Vec::new();
    combat.apply_damage_now(&mut world, &hit(id, 500.0), 10.0, &mut effects);
    assert!(world.is_dead(id));

    assert!(!combat.revive(&mut world, id, 12.0, &mut effects));
    let ready = resolve(&mut combat, &mut world, 13.0);
    assert!(ready
        .iter()
        .any(|e| matches!(e, CombatEffect::RespawnReady { target } if *target == id)));
    // Announced once only.
    let again = resolve(&mut combat, &mut world, 14.0);
    assert!(again.is_empty());

    assert!(combat.revive(&mut world, id, 14.0, &mut effects));
    let h = world.health(id).unwrap();
    assert_eq!(h.current, 100.0);
    assert!(!h.dead);
    assert!(h.is_invulnerable(14.0));
    assert_eq!(world.get::<Shield>(id).unwrap().current, 20.0);
    assert!(!combat.revive(&mut world, id, 15.0, &mut effects));
}

#[test]
fn test_revive_rejects_living_and_missing() {
    let mut world = World::new();
    let mut combat = combat();
    let id = world.spawn((Health::new(100.0),));
    let mut effects = Vec::new();
    assert!(!combat.revive(&mut world, id, 0.0, &mut effects));
    assert!(!combat.revive(&mut world, EntityId(u64::MAX), 0.0, &mut effects));
    assert!(effects.is_empty());
}
