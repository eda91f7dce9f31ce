//! Shared mutable state handed to every system.

use skirmish_core::config::SimConfig;
use skirmish_core::events::{CollisionEvent, CombatEffect};
use skirmish_core::types::{EntityId, SimTime};

use crate::combat::CombatSystem;
use crate::spatial::SpatialGrid;
use crate::systems::collision::ContactSet;
use crate::world::World;

/// Everything systems read and write. The spatial index and the component
/// store are the only shared mutable resources; systems run one at a time.
pub struct SimState {
    pub world: World,
    pub grid: SpatialGrid,
    pub combat: CombatSystem,
    pub time: SimTime,
    pub config: SimConfig,
    /// Pairs found in contact by the fixed pass since the last frame pass.
    pub fixed_contacts: ContactSet,
    /// Collision notifications produced this frame.
    pub collision_events: Vec<CollisionEvent>,
    /// Combat effects produced since the last frame report.
    pub effects: Vec<CombatEffect>,
    despawn_buffer: Vec<EntityId>,
}

impl SimState {
    pub fn new(config: SimConfig) -> Self {
        Self {
            world: World::new(),
            grid: SpatialGrid::new(config.collision.cell_size, config.collision.index_capacity),
            combat: CombatSystem::new(config.combat.clone(), config.seed),
            time: SimTime::default(),
            config,
            fixed_contacts: ContactSet::new(),
            collision_events: Vec::new(),
            effects: Vec::new(),
            despawn_buffer: Vec::new(),
        }
    }

    pub fn now(&self) -> f64 {
        self.time.now()
    }

    /// Remove an entity from the index, then from the store.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.grid.remove(id);
        self.world.despawn(id)
    }

    /// Queue an entity for removal at the end of the current system.
    pub fn mark_for_despawn(&mut self, id: EntityId) {
        self.despawn_buffer.push(id);
    }

    /// Despawn everything marked since the last flush.
    pub fn flush_despawns(&mut self) -> usize {
        let mut buffer = std::mem::take(&mut self.despawn_buffer);
        buffer.sort_unstable();
        buffer.dedup();
        let removed = buffer.iter().filter(|id| self.despawn(**id)).count();
        buffer.clear();
        self.despawn_buffer = buffer;
        removed
    }
}
