//! Per-entity interpolation buffer for remote replicas.
//!
//! Server states are buffered with their timestamps; the render pose is
//! reconstructed `delay` seconds in the past so two samples usually bracket
//! it. Past the newest sample the pose is extrapolated along the last known
//! velocity for at most `max_extrapolation` seconds, then held at that
//! extrapolated limit (not the newest sample's own pose).

use std::collections::VecDeque;

use glam::{Quat, Vec3};

use skirmish_core::components::Transform;
use skirmish_core::config::InterpolationConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub position: Vec3,
    pub rotation: Quat,
    /// Derived from the previous sample; zero for the first one.
    pub velocity: Vec3,
}

#[derive(Debug, Clone)]
pub struct InterpolationBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    delay: f64,
    max_extrapolation: f64,
}

impl InterpolationBuffer {
    pub fn new(capacity: usize, delay: f64, max_extrapolation: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            delay: delay.max(0.0),
            max_extrapolation: max_extrapolation.max(0.0),
        }
    }

    pub fn from_config(config: &InterpolationConfig) -> Self {
        Self::new(config.capacity, config.delay, config.max_extrapolation)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Append a server state. Samples not newer than the newest buffered one
    /// are dropped; returns whether the sample was kept.
    pub fn add_server_state(&mut self, position: Vec3, rotation: Quat, timestamp: f64) -> bool {
        if !timestamp.is_finite() || !position.is_finite() {
            return false;
        }
        let velocity = match self.samples.back() {
            Some(prev) if timestamp <= prev.timestamp => return false,
            Some(prev) => (position - prev.position) / (timestamp - prev.timestamp) as f32,
            None => Vec3::ZERO,
        };
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            timestamp,
            position,
            rotation: rotation.normalize(),
            velocity,
        });
        true
    }

    /// Pose to render at `render_time`. None until the first sample arrives.
    /// Beyond the extrapolation window the pose stays at the window's end.
    pub fn interpolated_transform(&self, render_time: f64) -> Option<Transform> {
        let target = render_time - self.delay;
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;

        if target <= oldest.timestamp {
            return Some(Transform::new(oldest.position, oldest.rotation));
        }

        if target >= newest.timestamp {
            let ahead = (target - newest.timestamp).min(self.max_extrapolation);
            let position = newest.position + newest.velocity * ahead as f32;
            return Some(Transform::new(position, newest.rotation));
        }

        // First sample strictly after the target; its predecessor brackets it.
        let idx = self.samples.partition_point(|s| s.timestamp <= target);
        let (a, b) = (self.samples[idx - 1], self.samples[idx]);
        let t = ((target - a.timestamp) / (b.timestamp - a.timestamp)) as f32;
        Some(Transform::new(
            a.position.lerp(b.position, t),
            a.rotation.slerp(b.rotation, t),
        ))
    }
}

impl Default for InterpolationBuffer {
    fn default() -> Self {
        Self::from_config(&InterpolationConfig::default())
    }
}
