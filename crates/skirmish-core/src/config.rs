//! Simulation configuration.
//!
//! Every section has defaults from `constants` and `#[serde(default)]`, so a
//! JSON file only needs the fields it overrides.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::enums::DamageType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level configuration for a simulation world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for the damage-modifier stage. Same seed = same simulation.
    pub seed: u64,
    /// Multiplier applied to every frame `dt` (1.0 = normal).
    pub time_scale: f64,
    pub schedule: ScheduleConfig,
    pub collision: CollisionConfig,
    pub movement: MovementConfig,
    pub combat: CombatConfig,
    pub interpolation: InterpolationConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_scale: 1.0,
            schedule: ScheduleConfig::default(),
            collision: CollisionConfig::default(),
            movement: MovementConfig::default(),
            combat: CombatConfig::default(),
            interpolation: InterpolationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fixed physics step (seconds).
    pub fixed_dt: f64,
    pub max_fixed_steps: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fixed_dt: FIXED_DT,
            max_fixed_steps: MAX_FIXED_STEPS_PER_FRAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub cell_size: f32,
    pub index_capacity: usize,
    pub contact_epsilon: f32,
    /// Push direction used when two centres coincide.
    pub fallback_axis: Vec3,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            cell_size: GRID_CELL_SIZE,
            index_capacity: GRID_CAPACITY,
            contact_epsilon: CONTACT_EPSILON,
            fallback_axis: Vec3::X,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub ground_height: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            ground_height: GROUND_HEIGHT,
        }
    }
}

/// Bonus granted per damage-over-time stack of one damage type, capped to
/// bound how far a networked client can drift from the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotRule {
    pub damage_type: DamageType,
    /// Fractional bonus per stack (0.1 = +10%).
    pub per_stack_bonus: f32,
    /// Upper bound on the summed bonus.
    pub max_bonus: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    /// Flat percentage bonus on all outgoing damage (25.0 = +25%).
    pub bonus_percent: f32,
    pub dot_rules: Vec<DotRule>,
    pub dot_stack_window: f64,
    pub corrupted_initial_slow: f32,
    pub corrupted_recovery_rate: f32,
    pub revive_invulnerability: f64,
    pub corpse_linger: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            crit_chance: CRIT_CHANCE,
            crit_multiplier: CRIT_MULTIPLIER,
            bonus_percent: 0.0,
            dot_rules: vec![
                DotRule {
                    damage_type: DamageType::Poison,
                    per_stack_bonus: 0.10,
                    max_bonus: 0.50,
                },
                DotRule {
                    damage_type: DamageType::Bleed,
                    per_stack_bonus: 0.08,
                    max_bonus: 0.40,
                },
                DotRule {
                    damage_type: DamageType::Corruption,
                    per_stack_bonus: 0.05,
                    max_bonus: 0.25,
                },
            ],
            dot_stack_window: DOT_STACK_WINDOW,
            corrupted_initial_slow: CORRUPTED_INITIAL_SLOW,
            corrupted_recovery_rate: CORRUPTED_RECOVERY_RATE,
            revive_invulnerability: REVIVE_INVULNERABILITY,
            corpse_linger: CORPSE_LINGER,
        }
    }
}

impl CombatConfig {
    pub fn dot_rule(&self, damage_type: DamageType) -> Option<&DotRule> {
        self.dot_rules.iter().find(|r| r.damage_type == damage_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub capacity: usize,
    pub delay: f64,
    pub max_extrapolation: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            capacity: INTERP_CAPACITY,
            delay: INTERP_DELAY,
            max_extrapolation: INTERP_MAX_EXTRAPOLATION,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(self.time_scale >= 0.0 && self.time_scale <= MAX_TIME_SCALE) {
            return Err(invalid(
                "time_scale",
                format!("must be within [0, {MAX_TIME_SCALE}]"),
            ));
        }
        if !(self.schedule.fixed_dt > 0.0) {
            return Err(invalid("schedule.fixed_dt", "must be positive"));
        }
        if self.schedule.max_fixed_steps == 0 {
            return Err(invalid("schedule.max_fixed_steps", "must be at least 1"));
        }
        if !(self.collision.cell_size > 0.0) {
            return Err(invalid("collision.cell_size", "must be positive"));
        }
        if self.collision.index_capacity == 0 {
            return Err(invalid("collision.index_capacity", "must be at least 1"));
        }
        if self.collision.fallback_axis.length_squared() < 1e-12 {
            return Err(invalid("collision.fallback_axis", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.combat.crit_chance) {
            return Err(invalid("combat.crit_chance", "must be within [0, 1]"));
        }
        if self.combat.crit_multiplier < 1.0 {
            return Err(invalid("combat.crit_multiplier", "must be at least 1"));
        }
        if let Some(rule) = self
            .combat
            .dot_rules
            .iter()
            .find(|r| r.per_stack_bonus < 0.0 || r.max_bonus < 0.0)
        {
            return Err(invalid(
                "combat.dot_rules",
                format!("negative bonus for {:?}", rule.damage_type),
            ));
        }
        if self.interpolation.capacity < 2 {
            return Err(invalid("interpolation.capacity", "must hold at least 2 samples"));
        }
        if self.interpolation.delay < 0.0 || self.interpolation.max_extrapolation < 0.0 {
            return Err(invalid(
                "interpolation",
                "delay and max_extrapolation must be non-negative",
            ));
        }
        Ok(())
    }
}
