use crate::features::{Observation, OBSERVATION_SIZE};
use crate::game::Action;
use crate::sequential::tensor::Tensor;

use rand::Rng;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("cannot sample {requested} transitions from a buffer holding {available}")]
    InsufficientSamples { requested: usize, available: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub action: Action,
    pub reward: f32,
    pub next_observation: Observation,
    pub terminal: bool,
}

// Fixed-capacity ring: once full, every push evicts the oldest entry.
pub struct ReplayBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize
}

impl<T> ReplayBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity
        }
    }

    pub fn push(&mut self, item: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    // `n` distinct entries chosen uniformly at random; the buffer is left untouched.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<&T>, ReplayError> {
        if n > self.buffer.len() {
            return Err(ReplayError::InsufficientSamples { requested: n, available: self.buffer.len() });
        }

        let indices = rand::seq::index::sample(rng, self.buffer.len(), n);
        Ok(indices.iter().map(|index| &self.buffer[index]).collect())
    }
}

// Column-stacked transitions ready for a network pass.
pub struct TransitionBatch {
    pub observations: Tensor,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_observations: Tensor,
    pub terminals: Vec<bool>,
}

impl TransitionBatch {
    pub fn from_transitions(transitions: &[&Transition]) -> Self {
        let batch_size = transitions.len();

        let mut observations = Vec::with_capacity(batch_size * OBSERVATION_SIZE);
        let mut next_observations = Vec::with_capacity(batch_size * OBSERVATION_SIZE);
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut terminals = Vec::with_capacity(batch_size);

        for transition in transitions {
            observations.extend_from_slice(transition.observation.as_slice());
            next_observations.extend_from_slice(transition.next_observation.as_slice());
            actions.push(transition.action.index());
            rewards.push(transition.reward);
            terminals.push(transition.terminal);
        }

        Self {
            observations: Tensor::from_vec(observations, vec![batch_size, OBSERVATION_SIZE]),
            actions,
            rewards,
            next_observations: Tensor::from_vec(next_observations, vec![batch_size, OBSERVATION_SIZE]),
            terminals,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
