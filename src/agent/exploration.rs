use crate::game::Action;
use crate::sequential::tensor::argmax;

use rand::{Rng, RngCore};

// Turns per-action value estimates into an action.
pub trait ActionSelector {
    fn select(&mut self, q_values: &[f32], rng: &mut dyn RngCore) -> Action;
}

fn best_action(q_values: &[f32]) -> Action {
    Action::from_index(argmax(q_values)).unwrap_or(Action::NoOp)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl ActionSelector for Greedy {
    fn select(&mut self, q_values: &[f32], _rng: &mut dyn RngCore) -> Action {
        best_action(q_values)
    }
}

// Multiplicative decay toward a floor, applied once per episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationSchedule {
    floor: f32,
    decay: f32,
    current: f32,
}

impl ExplorationSchedule {
    pub fn new(start: f32, floor: f32, decay: f32) -> Self {
        Self { floor, decay, current: start.max(floor) }
    }

    pub fn epsilon(&self) -> f32 {
        self.current
    }

    pub fn decay(&mut self) -> f32 {
        self.current = (self.current * self.decay).max(self.floor);
        self.current
    }
}

pub struct EpsilonGreedy {
    schedule: ExplorationSchedule,
}

impl EpsilonGreedy {
    pub fn new(schedule: ExplorationSchedule) -> Self {
        Self { schedule }
    }

    pub fn epsilon(&self) -> f32 {
        self.schedule.epsilon()
    }

    pub fn decay(&mut self) -> f32 {
        self.schedule.decay()
    }
}

impl ActionSelector for EpsilonGreedy {
    fn select(&mut self, q_values: &[f32], rng: &mut dyn RngCore) -> Action {
        if rng.random::<f32>() < self.schedule.epsilon() {
            Action::ALL[rng.random_range(0..Action::COUNT)]
        } else {
            best_action(q_values)
        }
    }
}
