// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Scores every image in the test directory with the best
// checkpoint and writes the submission:
//
//   Step 1: Open the checkpoint directory     (Layer 6 - infra)
//   Step 2: List test images (sorted)         (Layer 4 - data)
//   Step 3: Rebuild + load the model          (Layer 5 - ml)
//   Step 4: Score in batches                  (Layer 5 - ml)
//   Step 5: Write the submission              (Layer 6 - infra)
//
// The submission is only written once every image has been
// scored; a decode failure leaves no output file.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::application::BackendKind;
use crate::data::{batcher::ImageBatcher, index::SampleIndex, preprocessor::ImagePreprocessor};
use crate::infra::{checkpoint::CheckpointManager, submission::SubmissionWriter};
use crate::ml::inferencer::{predict_images, Inferencer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub checkpoint_dir: String,
    pub test_dir:       String,
    pub image_ext:      String,
    pub output:         String,
    pub batch_size:     usize,
    pub backend:        BackendKind,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "checkpoints".to_string(),
            test_dir:       "data/test".to_string(),
            image_ext:      "tif".to_string(),
            output:         "submission.csv".to_string(),
            batch_size:     64,
            backend:        BackendKind::Wgpu,
        }
    }
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    /// Returns the number of rows written.
    pub fn execute(&self) -> Result<usize> {
        tracing::info!("Backend: {}", self.config.backend);
        match self.config.backend {
            BackendKind::Wgpu    => self.run::<Wgpu>(WgpuDevice::default()),
            BackendKind::NdArray => self.run::<NdArray>(NdArrayDevice::default()),
        }
    }

    fn run<B: Backend>(&self, device: B::Device) -> Result<usize> {
        let cfg = &self.config;

        // ── Step 1: Checkpoint ────────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::open(&cfg.checkpoint_dir)?;
        let train_cfg    = ckpt_manager.load_config().context("loading training config")?;

        // ── Step 2: Test images ───────────────────────────────────────────────
        let images = SampleIndex::new(&cfg.test_dir, &cfg.image_ext)
            .list_unlabeled()
            .context("listing test images")?;
        if images.is_empty() {
            tracing::warn!("No .{} files in '{}'", cfg.image_ext, cfg.test_dir);
        } else {
            tracing::info!("Found {} test images in '{}'", images.len(), cfg.test_dir);
        }

        // ── Step 3: Model ─────────────────────────────────────────────────────
        let inferencer = Inferencer::<B>::from_checkpoint(&ckpt_manager, device)
            .context("loading model")?;

        // ── Step 4: Score ─────────────────────────────────────────────────────
        // Same resolution the model was trained on; no augmentation.
        let batcher = ImageBatcher::new(ImagePreprocessor::square(train_cfg.image_size));
        let records = predict_images(&inferencer, &batcher, &images, cfg.batch_size)
            .context("scoring test images")?;

        // ── Step 5: Submission ────────────────────────────────────────────────
        SubmissionWriter::new(&cfg.output)
            .write(&records)
            .context("writing submission")?;

        Ok(records.len())
    }
}
