//! Replica sync: drive remote entities' transforms from their
//! interpolation buffers at the start of each frame.

use skirmish_core::components::Transform;

use crate::interpolation::InterpolationBuffer;
use crate::schedule::{priority, System};
use crate::state::SimState;
use crate::world::World;

pub struct ReplicaSyncSystem;

impl System for ReplicaSyncSystem {
    fn name(&self) -> &str {
        "replica_sync"
    }

    fn priority(&self) -> i32 {
        priority::REPLICA_SYNC
    }

    fn run(&mut self, state: &mut SimState, _dt: f64) {
        let now = state.now();
        run(&mut state.world, now);
    }
}

/// Write the interpolated pose into every buffered entity's transform.
/// Entities whose buffer is still empty keep their current pose.
pub fn run(world: &mut World, render_time: f64) {
    for (_e, (transform, buffer)) in world
        .ecs_mut()
        .query_mut::<(&mut Transform, &InterpolationBuffer)>()
    {
        if let Some(pose) = buffer.interpolated_transform(render_time) {
            *transform = pose;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::{Quat, Vec3};

    #[test]
    fn transform_follows_buffer() {
        let mut world = World::new();
        let mut buffer = InterpolationBuffer::new(8, 0.1, 0.25);
        buffer.add_server_state(Vec3::ZERO, Quat::IDENTITY, 0.0);
        buffer.add_server_state(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY, 1.0);
        let id = world.spawn((Transform::default(), buffer));

        run(&mut world, 0.6);
        assert_abs_diff_eq!(world.transform(id).unwrap().position.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn empty_buffer_keeps_pose() {
        let mut world = World::new();
        let start = Transform::from_position(Vec3::new(3.0, 0.0, 0.0));
        let id = world.spawn((start, InterpolationBuffer::default()));
        run(&mut world, 5.0);
        assert_eq!(world.transform(id), Some(start));
    }
}
