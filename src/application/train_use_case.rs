// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1:  Validate configuration
//   Step 2:  Load the label table              (Layer 4 - data)
//   Step 3:  Resolve image paths               (Layer 4 - data)
//   Step 4:  Seeded train/validation split     (Layer 4 - data)
//   Step 5:  Build the image batcher           (Layer 4 - data)
//   Step 6:  Save config, open metrics CSV     (Layer 6 - infra)
//   Step 7:  Build the model (+ backbone)      (Layer 5 - ml)
//   Step 8:  Run the training loop             (Layer 5 - ml)
//   Step 9:  Evaluate the best model           (Layer 5 - ml)
//   Step 10: Export the backbone               (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    module::Module,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::BackendKind;
use crate::data::{
    augment::Augmentation,
    batcher::ImageBatcher,
    index::SampleIndex,
    loader::LabelStore,
    preprocessor::{ImagePreprocessor, DEFAULT_IMAGE_SIZE},
    splitter::{split_train_val, DEFAULT_VALIDATION_FRACTION},
};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::infra::{
    checkpoint::{load_backbone, CheckpointManager},
    metrics::{write_evaluation, MetricsLogger},
};
use crate::ml::{
    classifier::with_adam,
    evaluator::{evaluate, EvaluationReport, DEFAULT_THRESHOLD},
    model::CancerNetConfig,
    trainer::{collect_predictions, fit, TrainOutcome, TrainerConfig},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved as train_config.json so `predict` can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub labels_csv:          String,
    pub train_dir:           String,
    pub image_ext:           String,
    pub checkpoint_dir:      String,
    pub image_size:          u32,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub patience:            usize,
    pub lr:                  f64,
    pub validation_fraction: f64,
    pub seed:                u64,
    pub conv_filters:        Vec<usize>,
    pub dense_units:         usize,
    pub dropout:             f64,
    pub augment:             bool,
    pub prefetch:            usize,
    pub backend:             BackendKind,
    pub pretrained_backbone: Option<String>,
    pub freeze_backbone:     bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            labels_csv:          "data/train_labels.csv".to_string(),
            train_dir:           "data/train".to_string(),
            image_ext:           "tif".to_string(),
            checkpoint_dir:      "checkpoints".to_string(),
            image_size:          DEFAULT_IMAGE_SIZE,
            batch_size:          64,
            epochs:              10,
            patience:            3,
            lr:                  1e-4,
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            seed:                42,
            conv_filters:        vec![32, 64, 128],
            dense_units:         256,
            dropout:             0.5,
            augment:             true,
            prefetch:            2,
            backend:             BackendKind::Wgpu,
            pretrained_backbone: None,
            freeze_backbone:     false,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> CancerNetConfig {
        CancerNetConfig::new(self.conv_filters.clone(), self.dense_units, self.dropout)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            epochs:     self.epochs,
            patience:   self.patience,
            batch_size: self.batch_size,
        }
    }

    pub fn augmentation(&self) -> Option<Augmentation> {
        self.augment.then(|| Augmentation::all(self.seed))
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.image_size == 0 {
            return Err(PipelineError::config("image_size must be positive"));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(PipelineError::config(format!("lr must be positive, got {}", self.lr)));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(PipelineError::config(format!(
                "validation_fraction must be in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        if self.freeze_backbone && self.pretrained_backbone.is_none() {
            tracing::warn!("--freeze-backbone without --pretrained-backbone freezes random weights");
        }
        self.trainer_config().validate()?;
        self.model_config().validate(self.image_size as usize)
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub outcome:    TrainOutcome,
    pub evaluation: EvaluationReport,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline on the configured backend
    pub fn execute(&self) -> Result<TrainReport> {
        tracing::info!("Backend: {}", self.config.backend);
        match self.config.backend {
            BackendKind::Wgpu    => self.run::<Autodiff<Wgpu>>(WgpuDevice::default()),
            BackendKind::NdArray => self.run::<Autodiff<NdArray>>(NdArrayDevice::default()),
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Validate configuration ────────────────────────────────────
        cfg.validate().context("invalid training configuration")?;

        // ── Step 2: Load the label table ──────────────────────────────────────
        tracing::info!("Loading labels from '{}'", cfg.labels_csv);
        let store = LabelStore::from_csv(&cfg.labels_csv).context("loading label table")?;
        let dist  = store.class_distribution();
        tracing::info!(
            "Loaded {} labels ({} negative, {} positive)",
            store.len(),
            dist.negatives,
            dist.positives
        );

        // ── Step 3: Resolve image paths ───────────────────────────────────────
        // <train_dir>/<id>.<ext>; a missing file surfaces as a decode
        // error the first time it is read.
        let index   = SampleIndex::new(&cfg.train_dir, &cfg.image_ext);
        let samples = index.labeled(&store);

        // ── Step 4: Train / validation split ──────────────────────────────────
        // One seeded shuffle; the order is then fixed for every epoch.
        let partitions = split_train_val(samples, cfg.validation_fraction, cfg.seed)
            .context("partitioning samples")?;
        tracing::info!(
            "Split: {} train, {} validation",
            partitions.train.len(),
            partitions.validation.len()
        );

        // ── Step 5: Image batcher ─────────────────────────────────────────────
        let batcher = ImageBatcher::new(ImagePreprocessor::square(cfg.image_size))
            .with_augmentation(cfg.augmentation())
            .with_prefetch(cfg.prefetch);

        // ── Step 6: Checkpoint directory ──────────────────────────────────────
        let ckpt_manager = CheckpointManager::create(&cfg.checkpoint_dir)
            .context("creating checkpoint directory")?;
        ckpt_manager.save_config(cfg).context("saving training config")?;
        let metrics = MetricsLogger::create(&cfg.checkpoint_dir).context("creating metrics log")?;

        // ── Step 7: Build the model ───────────────────────────────────────────
        B::seed(cfg.seed);
        let mut model = cfg.model_config().init::<B>(&device);
        if let Some(path) = &cfg.pretrained_backbone {
            model.backbone = load_backbone(path, model.backbone.clone(), &device)
                .context("loading pretrained backbone")?;
            tracing::info!("Initialised backbone from '{}'", path);
        }
        if cfg.freeze_backbone {
            model.backbone = model.backbone.no_grad();
            tracing::info!("Backbone frozen; training the classification head only");
        }
        tracing::info!(
            "Model ready: {} conv blocks {:?}, {} dense units, {} parameters",
            cfg.conv_filters.len(),
            cfg.conv_filters,
            cfg.dense_units,
            model.num_params()
        );

        // ── Step 8: Training loop (Layer 5) ───────────────────────────────────
        let classifier = with_adam(model, cfg.lr, device);
        let (classifier, outcome) = fit(
            classifier,
            &partitions,
            &batcher,
            &ckpt_manager,
            &cfg.trainer_config(),
            Some(&metrics),
        )
        .context("training")?;
        tracing::info!(
            "Training finished: {:?} after {} epochs (best epoch {:?})",
            outcome.state,
            outcome.epochs_run,
            outcome.best_epoch
        );

        // ── Step 9: Evaluate the best model on validation ────────────────────
        let (labels, probs) =
            collect_predictions(&classifier, &batcher, &partitions.validation, cfg.batch_size)
                .context("scoring validation set")?;
        let evaluation = evaluate(&labels, &probs, DEFAULT_THRESHOLD)
            .context("evaluating best model")?;
        write_evaluation(ckpt_manager.dir(), &evaluation).context("writing evaluation report")?;

        tracing::info!(
            "Validation AUC={:.4} log_loss={:.4} accuracy={:.4}",
            evaluation.auc,
            evaluation.log_loss,
            evaluation.confusion.accuracy()
        );
        tracing::info!("Confusion matrix:\n{}", evaluation.confusion);
        tracing::info!("Classification report:\n{}", evaluation.report);

        // ── Step 10: Export the backbone ──────────────────────────────────────
        ckpt_manager
            .save_backbone(classifier.model())
            .context("exporting backbone")?;

        Ok(TrainReport { outcome, evaluation })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::{fs, path::Path};

    /// Five dark negatives and five bright positives, 10×10 PNGs.
    pub(crate) fn write_dataset(root: &Path) -> TrainConfig {
        let train_dir = root.join("train");
        fs::create_dir_all(&train_dir).unwrap();

        let mut csv = String::from("id,label\n");
        for i in 0..10 {
            let positive = i % 2 == 1;
            let shade    = if positive { 220 } else { 30 };
            let id       = format!("patch{i:02}");
            RgbImage::from_pixel(10, 10, Rgb([shade, shade / 2, shade]))
                .save(train_dir.join(format!("{id}.png")))
                .unwrap();
            csv.push_str(&format!("{id},{}\n", positive as u8));
        }
        let labels = root.join("labels.csv");
        fs::write(&labels, csv).unwrap();

        TrainConfig {
            labels_csv:          labels.display().to_string(),
            train_dir:           train_dir.display().to_string(),
            image_ext:           "png".to_string(),
            checkpoint_dir:      root.join("ckpt").display().to_string(),
            image_size:          8,
            batch_size:          4,
            epochs:              2,
            patience:            2,
            lr:                  1e-3,
            // 6 of 10 in validation: both classes are always present
            validation_fraction: 0.6,
            conv_filters:        vec![4],
            dense_units:         4,
            dropout:             0.0,
            backend:             BackendKind::NdArray,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_train_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_dataset(dir.path());

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert!(report.outcome.epochs_run >= 1);
        assert_eq!(report.evaluation.samples, 6);
        assert!((0.0..=1.0).contains(&report.evaluation.auc));

        let ckpt = Path::new(&cfg.checkpoint_dir);
        for file in [
            "best_model.mpk.gz",
            "backbone.mpk.gz",
            "train_config.json",
            "metrics.csv",
            "evaluation.json",
            "roc_curve.csv",
        ] {
            assert!(ckpt.join(file).exists(), "missing {file}");
        }
    }

    #[test]
    fn test_frozen_pretrained_backbone_carries_over() {
        let dir   = tempfile::tempdir().unwrap();
        let first = write_dataset(dir.path());
        TrainUseCase::new(first.clone()).execute().unwrap();
        let exported = Path::new(&first.checkpoint_dir).join("backbone.mpk.gz");

        let second = TrainConfig {
            checkpoint_dir:      dir.path().join("ckpt2").display().to_string(),
            seed:                first.seed + 1,
            pretrained_backbone: Some(exported.display().to_string()),
            freeze_backbone:     true,
            ..first.clone()
        };
        TrainUseCase::new(second.clone()).execute().unwrap();

        let device = Default::default();
        let shell  = || first.model_config().init::<NdArray>(&device).backbone;
        let before = load_backbone(&exported, shell(), &device).unwrap();
        let after  = load_backbone(
            Path::new(&second.checkpoint_dir).join("backbone.mpk.gz"),
            shell(),
            &device,
        )
        .unwrap();

        let conv = |b: &crate::ml::model::FeatureExtractor<NdArray>| {
            b.blocks[0].conv.weight.val().into_data().convert::<f32>().to_vec::<f32>().unwrap()
        };
        assert_eq!(conv(&after), conv(&before));
    }

    #[test]
    fn test_missing_image_aborts_with_its_id() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_dataset(dir.path());
        fs::remove_file(Path::new(&cfg.train_dir).join("patch03.png")).unwrap();

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("patch03"));
    }

    #[test]
    fn test_invalid_config_fails_before_reading_data() {
        let cfg = TrainConfig { patience: 0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());

        let cfg = TrainConfig { validation_fraction: 1.0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());

        assert!(TrainConfig::default().validate().is_ok());
    }
}
