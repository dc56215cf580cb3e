use crate::features::{Observation, OBSERVATION_SIZE};
use crate::game::Action;
use crate::sequential::{
    tensor::Tensor,
    layer::{Layer, Dense, ReLU},
    loss::MeanSquaredError,
    optimizer::Adam,
    Sequential
};

use rand::Rng;

// observation -> one value estimate per action, two hidden ReLU layers.
#[derive(Clone)]
pub struct QNetwork {
    model: Sequential,
}

impl QNetwork {
    pub fn new<R: Rng + ?Sized>(hidden_size: usize, learning_rate: f32, rng: &mut R) -> Self {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Dense::new(OBSERVATION_SIZE, hidden_size, rng)),
            Box::new(ReLU::new()),
            Box::new(Dense::new(hidden_size, hidden_size, rng)),
            Box::new(ReLU::new()),
            Box::new(Dense::new(hidden_size, Action::COUNT, rng)),
        ];
        let model = Sequential::new(layers, Box::new(MeanSquaredError), Box::new(Adam::new(learning_rate)));

        Self { model }
    }

    pub fn evaluate(&mut self, observation: &Observation) -> Vec<f32> {
        let output = self.model.predict(&observation.to_tensor());
        let values = output.read().clone();
        values
    }

    // [batch, OBSERVATION_SIZE] -> [batch, action count]
    pub fn evaluate_batch(&mut self, observations: &Tensor) -> Tensor {
        self.model.predict(observations)
    }

    pub fn train_on_batch(&mut self, observations: &Tensor, targets: &Tensor) -> f32 {
        self.model.train_on_batch(observations, targets)
    }

    // wholesale overwrite, optimizer state is left alone
    pub fn copy_from(&mut self, other: &QNetwork) {
        self.model.copy_weights_from(&other.model);
    }

    pub fn parameters(&self) -> Vec<f32> {
        self.model.parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_output_has_one_value_per_action() {
        let mut network = QNetwork::new(16, 1e-3, &mut StdRng::seed_from_u64(0));
        let values = network.evaluate(&Observation([0.4, -0.1, 0.5, 0.05]));
        assert_eq!(values.len(), Action::COUNT);

        let batch = Tensor::from_vec(vec![0.1; 3 * OBSERVATION_SIZE], vec![3, OBSERVATION_SIZE]);
        assert_eq!(network.evaluate_batch(&batch).shape, vec![3, Action::COUNT]);
    }

    #[test]
    fn test_parameter_count() {
        let network = QNetwork::new(8, 1e-3, &mut StdRng::seed_from_u64(0));
        // (4*8 + 8) + (8*8 + 8) + (8*2 + 2)
        assert_eq!(network.parameters().len(), 40 + 72 + 18);
    }

    #[test]
    fn test_clone_then_train_leaves_copy_untouched() {
        let mut policy = QNetwork::new(8, 1e-2, &mut StdRng::seed_from_u64(3));
        let target = policy.clone();
        assert_eq!(policy.parameters(), target.parameters());

        let observations = Tensor::from_vec(vec![0.5, 0.1, 0.3, -0.2], vec![1, OBSERVATION_SIZE]);
        let targets = Tensor::from_vec(vec![1.0, -1.0], vec![1, Action::COUNT]);
        policy.train_on_batch(&observations, &targets);

        assert_ne!(policy.parameters(), target.parameters());
    }

    #[test]
    fn test_copy_from_synchronises() {
        let policy = QNetwork::new(8, 1e-3, &mut StdRng::seed_from_u64(1));
        let mut target = QNetwork::new(8, 1e-3, &mut StdRng::seed_from_u64(2));
        assert_ne!(policy.parameters(), target.parameters());

        target.copy_from(&policy);
        assert_eq!(policy.parameters(), target.parameters());
    }
}
