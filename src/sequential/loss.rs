use super::tensor::Tensor;

pub trait Loss: Send + Sync {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32;
    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor;
    fn clone_box(&self) -> Box<dyn Loss>;
}


// mean squared error, averaged over the batch rows

#[derive(Clone, Copy, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32 {
        let diff = y_pred.map2(y_true, |pred_x, true_x| pred_x - true_x);
        let squared_errors = diff.map(|x| x * x);
        squared_errors.read().iter().sum::<f32>() / y_pred.shape[0] as f32
    }

    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor {
        let rows = y_pred.shape[0] as f32;
        y_pred.map2(y_true, |pred_x, true_x| 2.0 * (pred_x - true_x) / rows)
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(*self)
    }
}
