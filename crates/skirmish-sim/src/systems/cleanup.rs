//! Cleanup system: despawns corpses that will never respawn.

use skirmish_core::components::{Health, Respawn};

use crate::schedule::{priority, System};
use crate::state::SimState;
use crate::world::id_of;

pub struct CleanupSystem;

impl System for CleanupSystem {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn priority(&self) -> i32 {
        priority::CLEANUP
    }

    fn run(&mut self, state: &mut SimState, _dt: f64) {
        run(state);
    }
}

/// Dead entities without a `Respawn` linger for `corpse_linger` seconds, then
/// leave the index and the store. Returns the number despawned.
pub fn run(state: &mut SimState) -> usize {
    let now = state.now();
    let linger = state.config.combat.corpse_linger;

    let mut expired = Vec::new();
    for (entity, (health, respawn)) in state
        .world
        .ecs_mut()
        .query_mut::<(&Health, Option<&Respawn>)>()
    {
        if respawn.is_some() || !health.dead {
            continue;
        }
        if health.death_time.is_some_and(|t| now >= t + linger) {
            expired.push(id_of(entity));
        }
    }
    for id in expired {
        log::debug!("despawning corpse {id}");
        state.mark_for_despawn(id);
    }
    state.flush_despawns()
}
