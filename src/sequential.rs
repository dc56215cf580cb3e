pub mod tensor;
pub mod layer;
pub mod loss;
pub mod optimizer;

use tensor::Tensor;
use layer::{Layer, Dense};
use loss::Loss;
use optimizer::Optimizer;

// Feed-forward stack of layers with a loss and an optimizer.
pub struct Sequential {
    pub layers: Vec<Box<dyn Layer>>,
    pub loss: Box<dyn Loss>,
    pub optimizer: Box<dyn Optimizer>
}

impl Sequential {
    pub fn new(layers: Vec<Box<dyn Layer>>, loss: Box<dyn Loss>, optimizer: Box<dyn Optimizer>) -> Self {
        Self {
            layers,
            loss,
            optimizer
        }
    }

    pub fn predict(&mut self, input: &Tensor) -> Tensor {
        let mut output = input.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output);
        }
        output
    }

    // One forward/backward pass and one optimizer step. Returns the pre-step loss.
    pub fn train_on_batch(&mut self, x_batch: &Tensor, y_batch: &Tensor) -> f32 {
        let y_pred = self.predict(x_batch);
        let loss = self.loss.calculate(&y_pred, y_batch);
        let mut d_output = self.loss.gradient(&y_pred, y_batch);
        for layer in self.layers.iter_mut().rev() {
            d_output = layer.backward(&d_output);
        }
        self.optimizer.step(&mut self.layers);
        loss
    }

    // hard copy of every dense layer's parameters
    pub fn copy_weights_from(&mut self, other: &Self) {
        for (self_layer, other_layer) in self.layers.iter_mut().zip(other.layers.iter()) {
            if let (Some(self_dense), Some(other_dense)) = (self_layer.as_any_mut().downcast_mut::<Dense>(), other_layer.as_any().downcast_ref::<Dense>()) {
                self_dense.weights = other_dense.weights.deep_clone();
                self_dense.biases = other_dense.biases.deep_clone();
            }
        }
    }

    // All dense weights and biases, flattened in layer order.
    pub fn parameters(&self) -> Vec<f32> {
        let mut params = Vec::new();
        for layer in &self.layers {
            if let Some(dense) = layer.as_any().downcast_ref::<Dense>() {
                params.extend_from_slice(&dense.weights.read());
                params.extend_from_slice(&dense.biases.read());
            }
        }
        params
    }
}

impl Clone for Sequential {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(|layer| layer.clone_box()).collect(),
            loss: self.loss.clone_box(),
            optimizer: self.optimizer.clone_box()
        }
    }
}
