//! System scheduler.
//!
//! Each frame runs the fixed-rate physics pass zero or more times (driven by
//! an accumulator), then the variable-rate frame pass once. Within a pass,
//! systems run in ascending priority; ties keep registration order.

use skirmish_core::constants::FIXED_DT;

use crate::state::SimState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Once per variable-rate frame, with the frame dt.
    Frame,
    /// Once per fixed physics step, with the fixed dt.
    Fixed,
}

/// Built-in priorities. Lower runs first.
pub mod priority {
    pub const MOVEMENT: i32 = 0;
    pub const REPLICA_SYNC: i32 = 0;
    pub const COLLISION: i32 = 100;
    /// Default slot for gameplay systems (weapons, AI) that enqueue damage.
    pub const USER: i32 = 200;
    pub const COMBAT: i32 = 300;
    pub const CLEANUP: i32 = 400;
}

pub trait System {
    fn name(&self) -> &str;

    fn phase(&self) -> Phase {
        Phase::Frame
    }

    fn priority(&self) -> i32 {
        priority::USER
    }

    fn run(&mut self, state: &mut SimState, dt: f64);
}

/// Adapter so closures can be registered as systems.
pub struct FnSystem<F> {
    name: String,
    phase: Phase,
    priority: i32,
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut SimState, f64),
{
    pub fn new(name: impl Into<String>, phase: Phase, priority: i32, f: F) -> Self {
        Self {
            name: name.into(),
            phase,
            priority,
            f,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut SimState, f64),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn run(&mut self, state: &mut SimState, dt: f64) {
        (self.f)(state, dt)
    }
}

pub struct Scheduler {
    systems: Vec<Box<dyn System>>,
    fixed_dt: f64,
    max_fixed_steps: u32,
    accumulator: f64,
}

impl Scheduler {
    /// A non-positive or non-finite `fixed_dt` falls back to the default step.
    pub fn new(fixed_dt: f64, max_fixed_steps: u32) -> Self {
        let fixed_dt = if fixed_dt.is_finite() && fixed_dt > 0.0 {
            fixed_dt
        } else {
            FIXED_DT
        };
        Self {
            systems: Vec::new(),
            fixed_dt,
            max_fixed_steps: max_fixed_steps.max(1),
            accumulator: 0.0,
        }
    }

    pub fn add(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
        // Stable: equal priorities keep registration order.
        self.systems.sort_by_key(|s| s.priority());
    }

    /// System names in the order they run within `phase`.
    pub fn order(&self, phase: Phase) -> Vec<&str> {
        self.systems
            .iter()
            .filter(|s| s.phase() == phase)
            .map(|s| s.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Unconsumed time carried into the next frame.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Run one frame of `dt` seconds. Returns the number of fixed steps run.
    pub fn run_frame(&mut self, state: &mut SimState, dt: f64) -> u32 {
        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_fixed_steps {
            self.run_phase(Phase::Fixed, state, self.fixed_dt);
            state.time.fixed_steps += 1;
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        if self.accumulator >= self.fixed_dt {
            let dropped = (self.accumulator / self.fixed_dt).floor();
            log::warn!(
                "frame needed more than {} fixed steps, dropping {dropped} step(s)",
                self.max_fixed_steps
            );
            self.accumulator %= self.fixed_dt;
        }

        self.run_phase(Phase::Frame, state, dt);
        steps
    }

    fn run_phase(&mut self, phase: Phase, state: &mut SimState, dt: f64) {
        for system in self.systems.iter_mut().filter(|s| s.phase() == phase) {
            system.run(state, dt);
        }
    }
}
