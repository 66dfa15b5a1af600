// ============================================================
// Layer 5 — Burn Classifier
// ============================================================
// Adapts CancerNet + an optimiser to the Classifier trait the
// training loop is written against.
//
//   train_step: forward → BCE loss → backward → optimiser step
//   predict:    model.valid() (no autodiff, dropout off,
//               batch norm on running stats) → sigmoid
//
// Backends:
//   B = Autodiff<Wgpu>     on GPU
//   B = Autodiff<NdArray>  on CPU / in tests
// model.valid() returns the same model on B::InnerBackend.
//
// Reference: Burn Book §5 (Training), Kingma & Ba (2015) Adam

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::ImageTensor;
use crate::domain::sample::Label;
use crate::domain::traits::{Classifier, Predictor};
use crate::ml::model::{images_to_tensor, labels_to_tensor, tensor_to_vec, CancerNet};

pub struct BurnClassifier<B: AutodiffBackend, O> {
    model:  CancerNet<B>,
    optim:  O,
    lr:     f64,
    device: B::Device,
}

/// A classifier trained with Adam (ε = 1e-8).
pub fn with_adam<B: AutodiffBackend>(
    model:  CancerNet<B>,
    lr:     f64,
    device: B::Device,
) -> BurnClassifier<B, impl Optimizer<CancerNet<B>, B>> {
    let optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, CancerNet<B>>();
    BurnClassifier::new(model, optim, lr, device)
}

impl<B, O> BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<CancerNet<B>, B>,
{
    pub fn new(model: CancerNet<B>, optim: O, lr: f64, device: B::Device) -> Self {
        Self { model, optim, lr, device }
    }

    pub fn model(&self) -> &CancerNet<B> {
        &self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Replace the weights, keeping the optimiser state.
    pub fn with_model(mut self, model: CancerNet<B>) -> Self {
        self.model = model;
        self
    }
}

impl<B, O> Predictor for BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<CancerNet<B>, B>,
{
    fn predict(&self, images: &[ImageTensor]) -> PipelineResult<Vec<f32>> {
        let model = self.model.valid();
        let x     = images_to_tensor::<B::InnerBackend>(images, &self.device)?;
        tensor_to_vec(model.probabilities(x))
    }
}

impl<B, O> Classifier for BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<CancerNet<B>, B>,
{
    fn train_step(&mut self, images: &[ImageTensor], labels: &[Label]) -> PipelineResult<f64> {
        if images.len() != labels.len() {
            return Err(PipelineError::LengthMismatch {
                labels:      labels.len(),
                predictions: images.len(),
            });
        }

        let x = images_to_tensor::<B>(images, &self.device)?;
        let y = labels_to_tensor::<B>(labels, &self.device);

        let (loss, _) = self.model.forward_loss(x, y);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        // Backward pass + optimiser update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.lr, self.model.clone(), grads);

        Ok(loss_val)
    }
}
