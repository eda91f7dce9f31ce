//! Simulation core for SKIRMISH.
//!
//! Owns the entity/component store, spatial index, collision and combat
//! pipelines, and the scheduler that runs them on a fixed physics step and
//! a variable-rate frame step.

pub mod combat;
pub mod engine;
pub mod interpolation;
pub mod schedule;
pub mod spatial;
pub mod state;
pub mod systems;
pub mod world;

pub use engine::{FrameReport, SimulationEngine};
pub use skirmish_core as core;
