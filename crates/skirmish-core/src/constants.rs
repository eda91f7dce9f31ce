//! Simulation constants and tuning defaults.

// --- Timing ---

/// Fixed physics rate (Hz).
pub const FIXED_RATE: u32 = 60;

/// Seconds per fixed physics step.
pub const FIXED_DT: f64 = 1.0 / FIXED_RATE as f64;

/// Cap on fixed steps run in one frame; leftover time is dropped.
pub const MAX_FIXED_STEPS_PER_FRAME: u32 = 5;

/// Maximum time scale.
pub const MAX_TIME_SCALE: f64 = 4.0;

// --- Spatial index ---

/// Default grid cell edge (meters).
pub const GRID_CELL_SIZE: f32 = 4.0;

/// Default maximum number of indexed entities before the oldest is evicted.
pub const GRID_CAPACITY: usize = 4096;

// --- Collision ---

/// Penetration below this depth does not count as overlap (meters).
pub const CONTACT_EPSILON: f32 = 1e-4;

/// Distance under which two centres are considered coincident.
pub const COINCIDENT_EPSILON: f32 = 1e-6;

pub const LAYER_DEFAULT: u32 = 1;
pub const LAYER_ALL: u32 = u32::MAX;

// --- Movement ---

/// Default undebuffed speed cap (m/s).
pub const DEFAULT_MAX_SPEED: f32 = 6.0;

/// Ground plane height for gravity (meters).
pub const GROUND_HEIGHT: f32 = 0.0;

// --- Combat ---

pub const CRIT_CHANCE: f32 = 0.0;
pub const CRIT_MULTIPLIER: f32 = 2.0;

/// Seconds without a hit of a type before its damage-over-time stacks reset.
pub const DOT_STACK_WINDOW: f64 = 4.0;

/// Speed penalty applied by a fresh corrupted debuff.
pub const CORRUPTED_INITIAL_SLOW: f32 = 0.5;

/// Penalty recovered per second under corrupted.
pub const CORRUPTED_RECOVERY_RATE: f32 = 0.1;

/// Spawn protection after revive (seconds).
pub const REVIVE_INVULNERABILITY: f64 = 1.5;

/// Seconds a dead, non-respawnable entity lingers before despawn.
pub const CORPSE_LINGER: f64 = 3.0;

// --- Interpolation ---

/// Samples kept per remote entity.
pub const INTERP_CAPACITY: usize = 32;

/// Render delay behind the newest server state (seconds).
pub const INTERP_DELAY: f64 = 0.1;

/// Longest forward extrapolation before the pose holds (seconds).
pub const INTERP_MAX_EXTRAPOLATION: f64 = 0.25;
