//! Pluggable damage-modifier stage, injected at construction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use skirmish_core::config::CombatConfig;
use skirmish_core::enums::DamageType;
use skirmish_core::types::{EntityId, PlayerId};

/// Inputs to one modifier evaluation.
#[derive(Debug, Clone, Copy)]
pub struct DamageContext {
    pub target: EntityId,
    pub source: Option<EntityId>,
    pub source_player: Option<PlayerId>,
    pub damage_type: Option<DamageType>,
    pub base: f32,
    /// Stacks of `damage_type` already on the target.
    pub stacks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifiedDamage {
    pub amount: f32,
    pub critical: bool,
}

pub trait DamageModifier {
    fn modify(&mut self, ctx: &DamageContext) -> ModifiedDamage;
}

/// Passes the base amount through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModifiers;

impl DamageModifier for NoModifiers {
    fn modify(&mut self, ctx: &DamageContext) -> ModifiedDamage {
        ModifiedDamage {
            amount: ctx.base,
            critical: false,
        }
    }
}

/// Percentage bonus, capped damage-over-time stack bonus, then crit roll.
pub struct StandardModifiers {
    rng: ChaCha8Rng,
    config: CombatConfig,
}

impl StandardModifiers {
    pub fn new(config: &CombatConfig, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config: config.clone(),
        }
    }

    /// Summed stack bonus for `damage_type`, capped by its rule.
    pub fn stack_bonus(&self, damage_type: Option<DamageType>, stacks: u32) -> f32 {
        damage_type
            .and_then(|t| self.config.dot_rule(t))
            .map_or(0.0, |rule| {
                (rule.per_stack_bonus * stacks as f32).min(rule.max_bonus)
            })
    }
}

impl DamageModifier for StandardModifiers {
    fn modify(&mut self, ctx: &DamageContext) -> ModifiedDamage {
        let mut amount = ctx.base * (1.0 + self.config.bonus_percent / 100.0);
        amount *= 1.0 + self.stack_bonus(ctx.damage_type, ctx.stacks);

        // No roll at zero chance, so the RNG stream is untouched.
        let crit_chance = self.config.crit_chance;
        let critical = crit_chance > 0.0 && self.rng.gen::<f32>() < crit_chance;
        if critical {
            amount *= self.config.crit_multiplier;
        }
        ModifiedDamage {
            amount: amount.max(0.0),
            critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ctx(base: f32, damage_type: Option<DamageType>, stacks: u32) -> DamageContext {
        DamageContext {
            target: EntityId(1),
            source: None,
            source_player: None,
            damage_type,
            base,
            stacks,
        }
    }

    #[test]
    fn no_modifiers_is_identity() {
        let out = NoModifiers.modify(&ctx(12.5, Some(DamageType::Fire), 9));
        assert_eq!(out.amount, 12.5);
        assert!(!out.critical);
    }

    #[test]
    fn percent_bonus_applies() {
        let config = CombatConfig {
            bonus_percent: 25.0,
            ..Default::default()
        };
        let out = StandardModifiers::new(&config, 1).modify(&ctx(40.0, None, 0));
        assert_abs_diff_eq!(out.amount, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn stack_bonus_is_capped_per_type() {
        let mods = StandardModifiers::new(&CombatConfig::default(), 1);
        // Poison: +10% per stack, capped at +50%.
        assert_abs_diff_eq!(mods.stack_bonus(Some(DamageType::Poison), 2), 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(mods.stack_bonus(Some(DamageType::Poison), 40), 0.5, epsilon = 1e-6);
        // Bleed has its own cap.
        assert_abs_diff_eq!(mods.stack_bonus(Some(DamageType::Bleed), 40), 0.4, epsilon = 1e-6);
        // No rule, no bonus.
        assert_eq!(mods.stack_bonus(Some(DamageType::Fire), 40), 0.0);
        assert_eq!(mods.stack_bonus(None, 40), 0.0);
    }

    #[test]
    fn guaranteed_crit_multiplies() {
        let config = CombatConfig {
            crit_chance: 1.0,
            crit_multiplier: 3.0,
            ..Default::default()
        };
        let out = StandardModifiers::new(&config, 7).modify(&ctx(10.0, None, 0));
        assert!(out.critical);
        assert_abs_diff_eq!(out.amount, 30.0, epsilon = 1e-4);
    }

    #[test]
    fn crit_rolls_are_seeded() {
        let config = CombatConfig {
            crit_chance: 0.5,
            ..Default::default()
        };
        let mut a = StandardModifiers::new(&config, 99);
        let mut b = StandardModifiers::new(&config, 99);
        for _ in 0..50 {
            assert_eq!(a.modify(&ctx(1.0, None, 0)), b.modify(&ctx(1.0, None, 0)));
        }
    }
}
