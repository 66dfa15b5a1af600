// ============================================================
// Layer 5 — CancerNet (CNN classifier)
// ============================================================
// Input:  [batch, 3, H, W] images, values in [0, 1]
// Output: [batch] logits; sigmoid(logit) = P(tumour tissue)
//
//   ┌ ConvBlock × len(conv_filters) ┐
//   │ conv 3×3 (same) → BN → ReLU   │   H, W halved per block
//   │ → max-pool 2×2                │
//   └───────────────────────────────┘
//            ↓
//   global average pool → [batch, C]      ← FeatureExtractor
//            ↓
//   Linear(C → dense) → ReLU → Dropout
//            ↓
//   Linear(dense → 1) → logit
//
// The FeatureExtractor is a Module of its own so it can be saved,
// loaded into a new run and frozen (transfer learning).
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::BinaryCrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::{ImageTensor, CHANNELS};
use crate::domain::sample::Label;

// Config derive supplies Clone + serde; adding them again conflicts.
#[derive(Config, Debug)]
pub struct CancerNetConfig {
    /// Output channels of each conv block; every block halves H and W.
    pub conv_filters: Vec<usize>,
    pub dense_units:  usize,
    pub dropout:      f64,
}

impl CancerNetConfig {
    /// Reject architectures that cannot run on `image_size` inputs.
    pub fn validate(&self, image_size: usize) -> PipelineResult<()> {
        if self.conv_filters.is_empty() || self.conv_filters.contains(&0) {
            return Err(PipelineError::config("conv_filters must be non-empty and positive"));
        }
        if self.dense_units == 0 {
            return Err(PipelineError::config("dense_units must be positive"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PipelineError::config(format!(
                "dropout must be in [0, 1), got {}", self.dropout
            )));
        }
        let min_size = 1usize << self.conv_filters.len();
        if image_size < min_size {
            return Err(PipelineError::config(format!(
                "{} conv blocks need images of at least {min_size}px, got {image_size}px",
                self.conv_filters.len()
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> CancerNet<B> {
        let mut in_channels = CHANNELS;
        let blocks = self
            .conv_filters
            .iter()
            .map(|&out_channels| {
                let block = ConvBlock {
                    conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                        .with_padding(PaddingConfig2d::Same)
                        .init(device),
                    norm: BatchNormConfig::new(out_channels).init(device),
                    pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
                };
                in_channels = out_channels;
                block
            })
            .collect();

        let backbone = FeatureExtractor {
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        };

        CancerNet {
            backbone,
            hidden:  LinearConfig::new(in_channels, self.dense_units).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            output:  LinearConfig::new(self.dense_units, 1).init(device),
        }
    }
}

/// conv 3×3 → batch norm → ReLU → 2×2 max pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.norm.forward(self.conv.forward(x));
        self.pool.forward(relu(x))
    }
}

/// The convolutional backbone. Saved on its own so a later run can
/// start from it (and optionally freeze it).
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    pub blocks: Vec<ConvBlock<B>>,
    pub pool:   AdaptiveAvgPool2d,
}

impl<B: Backend> FeatureExtractor<B> {
    /// images: [batch, 3, H, W] → features: [batch, channels]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.pool.forward(x).flatten::<2>(1, 3)
    }
}

#[derive(Module, Debug)]
pub struct CancerNet<B: Backend> {
    pub backbone: FeatureExtractor<B>,
    pub hidden:   Linear<B>,
    pub dropout:  Dropout,
    pub output:   Linear<B>,
}

impl<B: Backend> CancerNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let features = self.backbone.forward(images);
        let hidden   = self.dropout.forward(relu(self.hidden.forward(features)));
        self.output.forward(hidden).flatten::<1>(0, 1)
    }

    /// Cancer probability per image: sigmoid of the logit.
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        sigmoid(self.forward(images))
    }

    /// Binary cross-entropy on logits.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let logits = self.forward(images);
        let bce = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device());
        let loss = bce.forward(logits.clone(), targets);
        (loss, logits)
    }
}

// ─── Tensor conversion ────────────────────────────────────────────────────────

/// Stack HWC image tensors into one [batch, 3, H, W] tensor.
pub fn images_to_tensor<B: Backend>(
    images: &[ImageTensor],
    device: &B::Device,
) -> PipelineResult<Tensor<B, 4>> {
    let first = images
        .first()
        .ok_or_else(|| PipelineError::Model("cannot build a tensor from an empty batch".into()))?;
    let (height, width, _) = first.shape();

    let mut flat = Vec::with_capacity(images.len() * height * width * CHANNELS);
    for img in images {
        if img.shape() != first.shape() {
            return Err(PipelineError::Model(format!(
                "mixed image shapes in one batch: {:?} vs {:?}",
                first.shape(),
                img.shape()
            )));
        }
        img.extend_chw(&mut flat);
    }

    Ok(Tensor::<B, 1>::from_floats(flat.as_slice(), device)
        .reshape([images.len(), CHANNELS, height, width]))
}

/// 0/1 targets as an Int tensor of shape [batch].
pub fn labels_to_tensor<B: Backend>(labels: &[Label], device: &B::Device) -> Tensor<B, 1, Int> {
    let ints: Vec<i32> = labels.iter().map(|l| l.as_u8() as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device)
}

/// Read a 1-D float tensor back into host memory.
pub fn tensor_to_vec<B: Backend>(t: Tensor<B, 1>) -> PipelineResult<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| PipelineError::Model(format!("cannot read tensor data: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tiny_config() -> CancerNetConfig {
        CancerNetConfig::new(vec![4, 8], 8, 0.0)
    }

    fn images(n: usize, size: usize) -> Vec<ImageTensor> {
        (0..n)
            .map(|i| {
                let v = (i as f32 + 1.0) / (n as f32 + 1.0);
                ImageTensor::from_hwc(size, size, vec![v; size * size * CHANNELS]).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_forward_shape_and_probability_range() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device);

        let x = images_to_tensor::<TestBackend>(&images(3, 8), &device).unwrap();
        assert_eq!(x.dims(), [3, 3, 8, 8]);

        let probs = tensor_to_vec(model.probabilities(x)).unwrap();
        assert_eq!(probs.len(), 3);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_validate_rejects_too_small_images() {
        assert!(tiny_config().validate(8).is_ok());
        assert!(tiny_config().validate(3).is_err());
        assert!(CancerNetConfig::new(vec![], 8, 0.0).validate(96).is_err());
        assert!(CancerNetConfig::new(vec![4], 8, 1.0).validate(96).is_err());
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let device = Default::default();
        let mut batch = images(1, 8);
        batch.extend(images(1, 4));
        assert!(images_to_tensor::<TestBackend>(&batch, &device).is_err());
        assert!(images_to_tensor::<TestBackend>(&[], &device).is_err());
    }
}
