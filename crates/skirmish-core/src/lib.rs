//! Core types and definitions for the Skirmish simulation.
//!
//! This crate defines the vocabulary shared by the simulation and the
//! subsystems around it (renderer, network, gameplay): ids, geometry,
//! components, events, configuration, and render-facing snapshots.
//! It has no dependency on the ECS or any runtime framework.

pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;
