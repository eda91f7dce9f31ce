//! Scheduler slot for combat resolution. Runs after collision and gameplay
//! systems so damage enqueued this frame resolves this frame.

use crate::schedule::{priority, System};
use crate::state::SimState;

pub struct CombatPass;

impl System for CombatPass {
    fn name(&self) -> &str {
        "combat"
    }

    fn priority(&self) -> i32 {
        priority::COMBAT
    }

    fn run(&mut self, state: &mut SimState, dt: f64) {
        let now = state.now();
        state
            .combat
            .resolve(&mut state.world, now, dt, &mut state.effects);
    }
}
