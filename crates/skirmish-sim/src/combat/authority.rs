//! Damage authority: decides whether a target's health is owned locally or
//! by an external (networked) source of truth. Chosen once at construction.

use skirmish_core::components::AuthorityDelegated;
use skirmish_core::types::{EntityId, PlayerId};

use crate::world::World;

pub trait DamageAuthority {
    /// True if damage against `target` must be forwarded instead of applied.
    fn is_delegated(&self, world: &World, target: EntityId) -> bool;

    /// Hand a post-modifier damage amount to the external authority.
    fn forward(&mut self, target: EntityId, amount: f32, source_player: Option<PlayerId>);
}

/// Single-player / host: everything is applied locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalAuthority;

impl DamageAuthority for LocalAuthority {
    fn is_delegated(&self, _world: &World, _target: EntityId) -> bool {
        false
    }

    fn forward(&mut self, target: EntityId, _amount: f32, _source_player: Option<PlayerId>) {
        log::error!("local authority asked to forward damage for {target}");
    }
}

/// Networked client: entities carrying `AuthorityDelegated` are routed to
/// the callback, everything else is applied locally.
pub struct CallbackAuthority<F> {
    callback: F,
}

impl<F> CallbackAuthority<F>
where
    F: FnMut(EntityId, f32, Option<PlayerId>),
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> DamageAuthority for CallbackAuthority<F>
where
    F: FnMut(EntityId, f32, Option<PlayerId>),
{
    fn is_delegated(&self, world: &World, target: EntityId) -> bool {
        world.has::<AuthorityDelegated>(target)
    }

    fn forward(&mut self, target: EntityId, amount: f32, source_player: Option<PlayerId>) {
        (self.callback)(target, amount, source_player)
    }
}
