use super::layer::{Layer, Dense};
use super::tensor::Tensor;

pub trait Optimizer: Send + Sync {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]);
    fn clone_box(&self) -> Box<dyn Optimizer>;
}


// SGD

#[derive(Clone)]
pub struct SGD {
    learning_rate: f32
}

impl SGD {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]) {
        for layer in layers {
            if let Some(dense_layer) = layer.as_any_mut().downcast_mut::<Dense>() {
                if let (Some(d_weights), Some(d_biases)) = (&dense_layer.d_weights, &dense_layer.d_biases) {
                    let new_weights = dense_layer.weights.map2(d_weights, |w, dw| w - self.learning_rate * dw);
                    let new_biases = dense_layer.biases.map2(d_biases, |b, db| b - self.learning_rate * db);

                    dense_layer.weights = new_weights;
                    dense_layer.biases = new_biases;
                }
            }
        }
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}


// Adam

struct Moments {
    m: Tensor,
    v: Tensor,
}

impl Moments {
    fn zeros_like(t: &Tensor) -> Self {
        Self { m: Tensor::zeros(t.shape.clone()), v: Tensor::zeros(t.shape.clone()) }
    }

    fn deep_clone(&self) -> Self {
        Self { m: self.m.deep_clone(), v: self.v.deep_clone() }
    }

    // returns the updated parameter
    fn update(&mut self, param: &Tensor, grad: &Tensor, adam: &AdamStep) -> Tensor {
        self.m = self.m.map2(grad, |m, g| adam.beta1 * m + (1.0 - adam.beta1) * g);
        self.v = self.v.map2(grad, |v, g| adam.beta2 * v + (1.0 - adam.beta2) * g * g);

        let m_hat = self.m.map(|m| m / adam.bias1);
        let v_hat = self.v.map(|v| v / adam.bias2);
        let step = m_hat.map2(&v_hat, |m, v| adam.learning_rate * m / (v.sqrt() + adam.epsilon));
        param.map2(&step, |p, s| p - s)
    }
}

struct AdamStep {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    bias1: f32,
    bias2: f32,
}

// Adam with per-dense-layer first and second moment estimates.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    // (weights, biases) moments, indexed by dense layer ordinal
    moments: Vec<(Moments, Moments)>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            moments: Vec::new(),
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.t
    }
}

impl Clone for Adam {
    fn clone(&self) -> Self {
        Self {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            t: self.t,
            moments: self.moments.iter().map(|(w, b)| (w.deep_clone(), b.deep_clone())).collect(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]) {
        self.t += 1;
        let adam = AdamStep {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            bias1: 1.0 - self.beta1.powi(self.t),
            bias2: 1.0 - self.beta2.powi(self.t),
        };

        let mut dense_index = 0;
        for layer in layers {
            let Some(dense_layer) = layer.as_any_mut().downcast_mut::<Dense>() else {
                continue;
            };
            if self.moments.len() <= dense_index {
                self.moments.push((Moments::zeros_like(&dense_layer.weights), Moments::zeros_like(&dense_layer.biases)));
            }
            if let (Some(d_weights), Some(d_biases)) = (&dense_layer.d_weights, &dense_layer.d_biases) {
                let (weight_moments, bias_moments) = &mut self.moments[dense_index];
                let new_weights = weight_moments.update(&dense_layer.weights, d_weights, &adam);
                let new_biases = bias_moments.update(&dense_layer.biases, d_biases, &adam);

                dense_layer.weights = new_weights;
                dense_layer.biases = new_biases;
            }
            dense_index += 1;
        }
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len(), "vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < 1e-5, "mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    fn layer_with_gradients() -> Vec<Box<dyn Layer>> {
        let mut dense_layer = Dense::new(2, 2, &mut StdRng::seed_from_u64(0));
        dense_layer.weights = Tensor::from_vec(vec![10.0, 20.0, 30.0, 40.0], vec![2, 2]);
        dense_layer.biases = Tensor::from_vec(vec![5.0, 6.0], vec![1, 2]);
        dense_layer.d_weights = Some(Tensor::from_vec(vec![2.0, 3.0, -4.0, 5.0], vec![2, 2]));
        dense_layer.d_biases = Some(Tensor::from_vec(vec![0.5, -1.5], vec![1, 2]));
        vec![Box::new(dense_layer)]
    }

    fn dense(layers: &[Box<dyn Layer>]) -> &Dense {
        layers[0].as_any().downcast_ref::<Dense>().unwrap()
    }

    #[test]
    fn test_sgd_optimizer_step() {
        let mut layers = layer_with_gradients();
        SGD::new(0.1).step(&mut layers);

        // new = old - lr * grad
        assert_vec_approx_eq(&dense(&layers).weights.read(), &[9.8, 19.7, 30.4, 39.5]);
        assert_vec_approx_eq(&dense(&layers).biases.read(), &[4.95, 6.15]);
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        // after bias correction the first step is lr * sign(grad)
        let mut layers = layer_with_gradients();
        let mut adam = Adam::new(0.01);
        adam.step(&mut layers);

        assert_eq!(adam.steps_taken(), 1);
        assert_vec_approx_eq(&dense(&layers).weights.read(), &[9.99, 19.99, 30.01, 39.99]);
        assert_vec_approx_eq(&dense(&layers).biases.read(), &[4.99, 6.01]);
    }

    #[test]
    fn test_adam_skips_layers_without_gradients() {
        let mut layers: Vec<Box<dyn Layer>> = vec![Box::new(Dense::new(2, 2, &mut StdRng::seed_from_u64(1)))];
        let before = dense(&layers).weights.deep_clone();
        Adam::new(0.01).step(&mut layers);
        assert_eq!(dense(&layers).weights, before);
    }
}
