// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained model from a checkpoint directory and
// scores unlabeled images:
//
//   train_config.json → CancerNetConfig → init → load best_model
//   [ImageRef] → decode (batched) → sigmoid(logit) → PredictionRecord
//
// Runs on a plain (non-autodiff) backend; dropout is inactive
// and batch norm uses its running statistics.

use burn::prelude::*;

use crate::data::batcher::ImageBatcher;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::ImageTensor;
use crate::domain::prediction::PredictionRecord;
use crate::domain::sample::ImageRef;
use crate::domain::traits::Predictor;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{images_to_tensor, tensor_to_vec, CancerNet};

pub struct Inferencer<B: Backend> {
    model:  CancerNet<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> PipelineResult<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let model = cfg.model_config().init::<B>(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt_manager.model_path().display());
        Ok(Self { model, device })
    }
}

impl<B: Backend> Predictor for Inferencer<B> {
    fn predict(&self, images: &[ImageTensor]) -> PipelineResult<Vec<f32>> {
        let x = images_to_tensor::<B>(images, &self.device)?;
        tensor_to_vec(self.model.probabilities(x))
    }
}

/// Score `images` in batches, keeping their order.
pub fn predict_images<P: Predictor + ?Sized>(
    predictor:  &P,
    batcher:    &ImageBatcher,
    images:     &[ImageRef],
    batch_size: usize,
) -> PipelineResult<Vec<PredictionRecord>> {
    let mut records = Vec::with_capacity(images.len());

    for (i, chunk) in images.chunks(batch_size.max(1)).enumerate() {
        let decoded = batcher.decode_images(chunk)?;
        let probs   = predictor.predict(&decoded)?;
        if probs.len() != chunk.len() {
            return Err(PipelineError::LengthMismatch {
                labels:      chunk.len(),
                predictions: probs.len(),
            });
        }
        records.extend(
            chunk.iter().zip(probs).map(|(img, p)| PredictionRecord::new(img.id.clone(), p)),
        );
        tracing::debug!("Scored batch {} ({} images)", i + 1, chunk.len());
    }

    Ok(records)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::data::preprocessor::ImagePreprocessor;
    use image::{Rgb, RgbImage};

    type TestBackend = burn::backend::NdArray;

    /// Scores each image by its mean red channel.
    struct Brightness;

    impl Predictor for Brightness {
        fn predict(&self, images: &[ImageTensor]) -> PipelineResult<Vec<f32>> {
            Ok(images.iter().map(|img| img.get(0, 0, 0)).collect())
        }
    }

    fn write_images(dir: &std::path::Path, shades: &[u8]) -> Vec<ImageRef> {
        shades
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let path = dir.join(format!("img{i}.tif"));
                RgbImage::from_pixel(6, 6, Rgb([s, 0, 0])).save(&path).unwrap();
                ImageRef::new(format!("img{i}"), path)
            })
            .collect()
    }

    #[test]
    fn test_predict_images_keeps_order_across_batches() {
        let dir     = tempfile::tempdir().unwrap();
        let images  = write_images(dir.path(), &[255, 0, 51, 102, 204]);
        let batcher = ImageBatcher::new(ImagePreprocessor::square(6));

        let records = predict_images(&Brightness, &batcher, &images, 2).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["img0", "img1", "img2", "img3", "img4"]);
        assert!((records[0].probability - 1.0).abs() < 1e-6);
        assert!(records[1].probability.abs() < 1e-6);
        assert!((records[2].probability - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_inferencer_from_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::create(dir.path().join("ckpt")).unwrap();

        let cfg = TrainConfig {
            conv_filters: vec![4],
            dense_units:  4,
            image_size:   8,
            ..TrainConfig::default()
        };
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&cfg.model_config().init::<TestBackend>(&device)).unwrap();

        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, device).unwrap();
        let images     = write_images(dir.path(), &[10, 200, 90]);
        let batcher    = ImageBatcher::new(ImagePreprocessor::square(8));

        let records = predict_images(&inferencer, &batcher, &images, 2).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| (0.0..=1.0).contains(&r.probability)));
    }

    #[test]
    fn test_missing_test_image_fails_whole_run() {
        let dir     = tempfile::tempdir().unwrap();
        let mut images = write_images(dir.path(), &[10, 20]);
        images.push(ImageRef::new("gone", dir.path().join("gone.tif")));
        let batcher = ImageBatcher::new(ImagePreprocessor::square(6));

        let err = predict_images(&Brightness, &batcher, &images, 8).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }
}
