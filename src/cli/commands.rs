// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `predict` and `stats`
// and all their configurable flags. Every default matches the
// Default impl of the corresponding application config.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    predict_use_case::PredictConfig,
    train_use_case::TrainConfig,
    BackendKind,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier on labeled tissue patches
    Train(TrainArgs),

    /// Score the test directory and write a submission CSV
    Predict(PredictArgs),

    /// Print row count and class balance of the label table
    Stats(StatsArgs),
}

/// Burn backend to run on
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    /// GPU (wgpu)
    Wgpu,
    /// CPU (ndarray)
    Ndarray,
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Wgpu    => BackendKind::Wgpu,
            BackendArg::Ndarray => BackendKind::NdArray,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV with header `id,label`
    #[arg(long, default_value = "data/train_labels.csv")]
    pub labels_csv: String,

    /// Directory holding one `<id>.<ext>` image per label row
    #[arg(long, default_value = "data/train")]
    pub train_dir: String,

    /// Image file extension
    #[arg(long, default_value = "tif")]
    pub image_ext: String,

    /// Directory for weights, config, metrics and evaluation output
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Images are resized to image_size × image_size
    #[arg(long, default_value_t = 96)]
    pub image_size: u32,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Maximum number of epochs
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Stop after this many epochs without a lower validation loss
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Share of samples held out for validation, in [0, 1)
    #[arg(long, default_value_t = 0.2)]
    pub validation_fraction: f64,

    /// Seeds the split, augmentation and weight initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output channels per conv block, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [32, 64, 128])]
    pub conv_filters: Vec<usize>,

    #[arg(long, default_value_t = 256)]
    pub dense_units: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Disable random flips and rotations of training images
    #[arg(long)]
    pub no_augment: bool,

    /// Batches decoded ahead of the training step (0 = inline)
    #[arg(long, default_value_t = 2)]
    pub prefetch: usize,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,

    /// Feature extractor saved by an earlier run (backbone.mpk.gz)
    #[arg(long)]
    pub pretrained_backbone: Option<String>,

    /// Keep the backbone weights fixed, train only the head
    #[arg(long)]
    pub freeze_backbone: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            labels_csv:          a.labels_csv,
            train_dir:           a.train_dir,
            image_ext:           a.image_ext,
            checkpoint_dir:      a.checkpoint_dir,
            image_size:          a.image_size,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            patience:            a.patience,
            lr:                  a.lr,
            validation_fraction: a.validation_fraction,
            seed:                a.seed,
            conv_filters:        a.conv_filters,
            dense_units:         a.dense_units,
            dropout:             a.dropout,
            augment:             !a.no_augment,
            prefetch:            a.prefetch,
            backend:             a.backend.into(),
            pretrained_backbone: a.pretrained_backbone,
            freeze_backbone:     a.freeze_backbone,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory of unlabeled images; id = file stem
    #[arg(long, default_value = "data/test")]
    pub test_dir: String,

    #[arg(long, default_value = "tif")]
    pub image_ext: String,

    /// Submission CSV to write
    #[arg(long, default_value = "submission.csv")]
    pub output: String,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            checkpoint_dir: a.checkpoint_dir,
            test_dir:       a.test_dir,
            image_ext:      a.image_ext,
            output:         a.output,
            batch_size:     a.batch_size,
            backend:        a.backend.into(),
        }
    }
}

/// All arguments for the `stats` command
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long, default_value = "data/train_labels.csv")]
    pub labels_csv: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["histo-cancer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let from_cli: TrainConfig = args.into();
        let defaults = TrainConfig::default();
        assert_eq!(
            serde_json::to_value(&from_cli).unwrap(),
            serde_json::to_value(&defaults).unwrap()
        );
    }

    #[test]
    fn test_train_flags_parsed() {
        let cli = Cli::try_parse_from([
            "histo-cancer", "train",
            "--conv-filters", "8,16",
            "--backend", "ndarray",
            "--no-augment",
            "--pretrained-backbone", "old/backbone.mpk.gz",
            "--freeze-backbone",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.conv_filters, vec![8, 16]);
        assert_eq!(cfg.backend, BackendKind::NdArray);
        assert!(!cfg.augment);
        assert!(cfg.freeze_backbone);
        assert_eq!(cfg.pretrained_backbone.as_deref(), Some("old/backbone.mpk.gz"));
    }

    #[test]
    fn test_predict_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["histo-cancer", "predict"]).unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };

        let from_cli: PredictConfig = args.into();
        assert_eq!(
            serde_json::to_value(&from_cli).unwrap(),
            serde_json::to_value(PredictConfig::default()).unwrap()
        );
    }
}
