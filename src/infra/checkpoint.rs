// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// File layout:
//   checkpoints/
//     best_model.mpk.gz   ← weights of the best epoch so far
//     backbone.mpk.gz     ← feature extractor of the best model,
//                           usable as --pretrained-backbone later
//     train_config.json   ← architecture + hyperparameters
//
// The training loop is the only writer. best_model is overwritten
// only when validation loss strictly improves, so after training
// it always holds the best epoch, not the last one.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Compresses with gzip
//   - Loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::{Path, PathBuf}};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::ModelStore;
use crate::ml::classifier::BurnClassifier;
use crate::ml::model::{CancerNet, FeatureExtractor};

const MODEL_FILE:    &str = "best_model";
const BACKBONE_FILE: &str = "backbone";
const CONFIG_FILE:   &str = "train_config.json";
const RECORD_EXT:    &str = ".mpk.gz";

/// Manages saving and loading of model checkpoints in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory (`mkdir -p`).
    pub fn create(dir: impl Into<PathBuf>) -> PipelineResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PipelineError::write(&dir, e))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory for reading.
    pub fn open(dir: impl Into<PathBuf>) -> PipelineResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(PipelineError::Checkpoint(format!(
                "checkpoint directory '{}' does not exist. Have you run 'train' first?",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the saved model record, including extension.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{MODEL_FILE}{RECORD_EXT}"))
    }

    /// Path of the exported backbone record, including extension.
    pub fn backbone_path(&self) -> PathBuf {
        self.dir.join(format!("{BACKBONE_FILE}{RECORD_EXT}"))
    }

    /// Overwrite best_model with `model`'s weights.
    pub fn save_model<B: Backend>(&self, model: &CancerNet<B>) -> PipelineResult<()> {
        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| {
                PipelineError::Checkpoint(format!("cannot save '{}': {e}", path.display()))
            })?;
        tracing::debug!("Saved model weights to '{}'", self.model_path().display());
        Ok(())
    }

    /// Load best_model into `model` (which must have the same architecture).
    pub fn load_model<B: Backend>(
        &self,
        model:  CancerNet<B>,
        device: &B::Device,
    ) -> PipelineResult<CancerNet<B>> {
        let path   = self.dir.join(MODEL_FILE);
        let record = CompactRecorder::new().load(path.clone(), device).map_err(|e| {
            PipelineError::Checkpoint(format!(
                "cannot load '{}': {e}. Have you trained the model first?",
                self.model_path().display()
            ))
        })?;
        Ok(model.load_record(record))
    }

    /// Export the feature extractor so a later run can reuse it.
    pub fn save_backbone<B: Backend>(&self, model: &CancerNet<B>) -> PipelineResult<()> {
        let path = self.dir.join(BACKBONE_FILE);
        CompactRecorder::new()
            .record(model.backbone.clone().into_record(), path.clone())
            .map_err(|e| {
                PipelineError::Checkpoint(format!("cannot save '{}': {e}", path.display()))
            })?;
        tracing::info!("Backbone exported to '{}'", self.backbone_path().display());
        Ok(())
    }

    /// Save the training configuration as pretty JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> PipelineResult<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)
            .map_err(|e| PipelineError::Checkpoint(format!("cannot serialise config: {e}")))?;
        fs::write(&path, json).map_err(|e| PipelineError::write(&path, e))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration written by `save_config`.
    pub fn load_config(&self) -> PipelineResult<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).map_err(|e| {
            PipelineError::Checkpoint(format!(
                "cannot read '{}': {e}. Make sure you have run 'train' before 'predict'.",
                path.display()
            ))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| PipelineError::Checkpoint(format!("invalid '{}': {e}", path.display())))
    }
}

/// Load a backbone record (e.g. `checkpoints/backbone.mpk.gz`) into
/// `backbone`. The `.mpk.gz` suffix is optional.
pub fn load_backbone<B: Backend>(
    path:     impl AsRef<Path>,
    backbone: FeatureExtractor<B>,
    device:   &B::Device,
) -> PipelineResult<FeatureExtractor<B>> {
    let path = record_stem(path.as_ref());
    let record = CompactRecorder::new().load(path.clone(), device).map_err(|e| {
        PipelineError::Checkpoint(format!(
            "cannot load backbone '{}{RECORD_EXT}': {e}",
            path.display()
        ))
    })?;
    Ok(backbone.load_record(record))
}

/// The recorder appends `.mpk.gz` itself; strip it if the user passed it.
fn record_stem(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(RECORD_EXT)) {
        Some(stem) => PathBuf::from(stem),
        None => path.to_path_buf(),
    }
}

// ─── ModelStore for the Burn classifier ──────────────────────────────────────
impl<B, O> ModelStore<BurnClassifier<B, O>> for CheckpointManager
where
    B: AutodiffBackend,
    O: Optimizer<CancerNet<B>, B>,
{
    fn save_best(&self, classifier: &BurnClassifier<B, O>, epoch: usize) -> PipelineResult<()> {
        self.save_model(classifier.model())?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        Ok(())
    }

    fn load_best(&self, classifier: BurnClassifier<B, O>) -> PipelineResult<BurnClassifier<B, O>> {
        let device = classifier.device().clone();
        let model  = self.load_model(classifier.model().clone(), &device)?;
        Ok(classifier.with_model(model))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{ImageTensor, CHANNELS};
    use crate::ml::model::{images_to_tensor, tensor_to_vec, CancerNetConfig};
    use burn::module::Param;

    type TestBackend = burn::backend::NdArray;

    fn sample_images() -> Vec<ImageTensor> {
        (0..2)
            .map(|i| ImageTensor::from_hwc(8, 8, vec![0.3 + 0.4 * i as f32; 8 * 8 * CHANNELS]).unwrap())
            .collect()
    }

    fn scores(model: &CancerNet<TestBackend>) -> Vec<f32> {
        let device = Default::default();
        let x = images_to_tensor::<TestBackend>(&sample_images(), &device).unwrap();
        tensor_to_vec(model.probabilities(x)).unwrap()
    }

    #[test]
    fn test_saved_weights_reload_into_fresh_model() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = CancerNetConfig::new(vec![4, 8], 8, 0.0);
        let ckpt   = CheckpointManager::create(dir.path()).unwrap();

        let trained = config.init::<TestBackend>(&device);
        ckpt.save_model(&trained).unwrap();
        assert!(ckpt.model_path().exists());

        let fresh    = config.init::<TestBackend>(&device);
        let restored = ckpt.load_model(fresh, &device).unwrap();

        for (a, b) in scores(&trained).iter().zip(scores(&restored)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    fn values<const D: usize>(param: &Param<Tensor<TestBackend, D>>) -> Vec<f32> {
        param.val().into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_backbone_export_accepts_full_file_name() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = CancerNetConfig::new(vec![4, 8], 4, 0.0);
        let ckpt   = CheckpointManager::create(dir.path()).unwrap();

        let model = config.init::<TestBackend>(&device);
        ckpt.save_backbone(&model).unwrap();
        assert!(ckpt.backbone_path().exists());

        let fresh = config.init::<TestBackend>(&device).backbone;
        assert_ne!(values(&fresh.blocks[0].conv.weight), values(&model.backbone.blocks[0].conv.weight));

        let with_ext = load_backbone(ckpt.backbone_path(), fresh.clone(), &device).unwrap();
        let bare     = load_backbone(dir.path().join("backbone"), fresh, &device).unwrap();
        for loaded in [&with_ext, &bare] {
            for (got, want) in loaded.blocks.iter().zip(&model.backbone.blocks) {
                assert_eq!(values(&got.conv.weight), values(&want.conv.weight));
                assert_eq!(values(&got.norm.gamma), values(&want.norm.gamma));
            }
        }
    }

    #[test]
    fn test_load_without_training_fails() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::create(dir.path()).unwrap();
        let model  = CancerNetConfig::new(vec![4], 4, 0.0).init::<TestBackend>(&device);

        assert!(matches!(ckpt.load_model(model, &device), Err(PipelineError::Checkpoint(_))));
        assert!(matches!(ckpt.load_config(), Err(PipelineError::Checkpoint(_))));
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::create(dir.path()).unwrap();
        let cfg  = TrainConfig { epochs: 3, seed: 9, ..TrainConfig::default() };

        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.seed, 9);
        assert_eq!(loaded.conv_filters, cfg.conv_filters);
    }

    #[test]
    fn test_open_missing_directory() {
        assert!(CheckpointManager::open("/no/such/checkpoints").is_err());
    }

    #[test]
    fn test_record_stem() {
        assert_eq!(record_stem(Path::new("a/backbone.mpk.gz")), PathBuf::from("a/backbone"));
        assert_eq!(record_stem(Path::new("a/backbone")), PathBuf::from("a/backbone"));
    }
}
