//! Built-in systems.
//!
//! Each system is a small struct implementing `schedule::System` around a
//! free function that does the work, so the functions can also be driven
//! directly in tests.

pub mod cleanup;
pub mod collision;
pub mod combat_pass;
pub mod movement;
pub mod replication;
pub mod snapshot;
