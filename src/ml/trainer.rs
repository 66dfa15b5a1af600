// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop with validation and early stopping, written against
// the Classifier / ModelStore traits so it runs the same on the
// Burn model and on test doubles.
//
// Per epoch:
//   1. Train:    every training batch → classifier.train_step()
//                (augmented, decoded by the batcher, optionally
//                prefetched on a producer thread)
//   2. Validate: predict every validation batch, then
//                val_loss = log-loss, val_auc = ROC AUC
//   3. Record:   append to metrics.csv
//   4. Decide:   val_loss strictly below the best so far?
//                  yes → save checkpoint, reset patience counter
//                  no  → counter += 1; stop when counter == patience
//
// After the loop the best checkpoint is loaded back, so the
// returned model is the best epoch's, not the last one's.
//
// Reference: Prechelt (1998), early stopping on validation loss

use serde::{Deserialize, Serialize};

use crate::data::batcher::{BatchMode, ImageBatcher};
use crate::data::dataset::{Partition, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::Label;
use crate::domain::traits::{Classifier, ModelStore, Predictor};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::evaluator::{log_loss, roc_auc};

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Maximum number of epochs
    pub epochs: usize,
    /// Epochs without improvement before stopping
    pub patience: usize,
    pub batch_size: usize,
}

impl TrainerConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.epochs == 0 {
            return Err(PipelineError::config("epochs must be at least 1"));
        }
        if self.patience == 0 {
            return Err(PipelineError::config("patience must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::config("batch_size must be at least 1"));
        }
        Ok(())
    }
}

// ─── Early stopping ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingState {
    Running,
    EarlyStopped,
    Completed,
}

/// What one epoch's validation loss meant for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Improved,
    Stale,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:   usize,
    best_loss:  f64,
    best_epoch: Option<usize>,
    stale:      usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best_loss: f64::INFINITY, best_epoch: None, stale: 0 }
    }

    pub fn observe(&mut self, metrics: &EpochMetrics) -> Progress {
        if metrics.is_improvement(self.best_loss) {
            self.best_loss  = metrics.val_loss;
            self.best_epoch = Some(metrics.epoch);
            self.stale      = 0;
            return Progress::Improved;
        }
        self.stale += 1;
        if self.stale >= self.patience {
            Progress::Exhausted
        } else {
            Progress::Stale
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainOutcome {
    pub state:         TrainingState,
    pub epochs_run:    usize,
    pub best_epoch:    Option<usize>,
    pub best_val_loss: f64,
    pub history:       Vec<EpochMetrics>,
}

// ─── Prediction pass ──────────────────────────────────────────────────────────

/// Score every sample of `partition` in order. Returns the labels
/// alongside so the two vectors stay aligned.
pub fn collect_predictions<P: Predictor + ?Sized>(
    predictor:  &P,
    batcher:    &ImageBatcher,
    partition:  &Partition,
    batch_size: usize,
) -> PipelineResult<(Vec<Label>, Vec<f32>)> {
    let mut labels = Vec::with_capacity(partition.len());
    let mut probs  = Vec::with_capacity(partition.len());

    batcher.for_each_batch(partition, batch_size, BatchMode::Eval, |batch| {
        let scores = predictor.predict(&batch.images)?;
        if scores.len() != batch.len() {
            return Err(PipelineError::LengthMismatch {
                labels:      batch.len(),
                predictions: scores.len(),
            });
        }
        labels.extend(batch.labels);
        probs.extend(scores);
        Ok(())
    })?;

    Ok((labels, probs))
}

// ─── Training loop ────────────────────────────────────────────────────────────

/// Train `model` until `config.epochs` or early stopping, then
/// return the best checkpointed model.
pub fn fit<C, S>(
    mut model:  C,
    partitions: &Partitions,
    batcher:    &ImageBatcher,
    store:      &S,
    config:     &TrainerConfig,
    logger:     Option<&MetricsLogger>,
) -> PipelineResult<(C, TrainOutcome)>
where
    C: Classifier,
    S: ModelStore<C>,
{
    config.validate()?;
    if partitions.train.is_empty() {
        return Err(PipelineError::config("training partition is empty"));
    }
    if partitions.validation.is_empty() {
        return Err(PipelineError::config(
            "validation partition is empty; raise the validation fraction or add samples",
        ));
    }

    tracing::info!(
        "Training on {} samples, validating on {} ({} batches/epoch)",
        partitions.train.len(),
        partitions.validation.len(),
        partitions.train.batch_count(config.batch_size),
    );

    let mut stopper = EarlyStopping::new(config.patience);
    let mut history = Vec::new();
    let mut state   = TrainingState::Running;

    for epoch in 1..=config.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0;
        let mut batches  = 0usize;
        batcher.for_each_batch(
            &partitions.train,
            config.batch_size,
            BatchMode::Train { epoch },
            |batch| {
                loss_sum += model.train_step(&batch.images, &batch.labels)?;
                batches  += 1;
                Ok(())
            },
        )?;
        let train_loss = loss_sum / batches.max(1) as f64;

        // ── Validation phase ──────────────────────────────────────────────────
        let (labels, probs) =
            collect_predictions(&model, batcher, &partitions.validation, config.batch_size)?;
        let val_loss = log_loss(&labels, &probs)?;
        let val_auc  = match roc_auc(&labels, &probs) {
            Ok(auc) => Some(auc),
            Err(PipelineError::DegenerateInput(_)) => None,
            Err(e) => return Err(e),
        };

        let metrics = EpochMetrics::new(epoch, train_loss, val_loss, val_auc);
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_auc={}",
            epoch,
            config.epochs,
            train_loss,
            val_loss,
            val_auc.map_or_else(|| "n/a".to_string(), |a| format!("{a:.4}")),
        );
        if let Some(logger) = logger {
            logger.log(&metrics)?;
        }

        let progress = stopper.observe(&metrics);
        history.push(metrics);

        match progress {
            Progress::Improved => store.save_best(&model, epoch)?,
            Progress::Stale => {}
            Progress::Exhausted => {
                tracing::info!(
                    "Early stopping after epoch {epoch}: no improvement for {} epochs",
                    config.patience
                );
                state = TrainingState::EarlyStopped;
                break;
            }
        }
    }

    if state == TrainingState::Running {
        state = TrainingState::Completed;
    }

    let model = match stopper.best_epoch() {
        Some(best) => {
            tracing::info!("Restoring best model from epoch {best} (val_loss={:.4})", stopper.best_loss());
            store.load_best(model)?
        }
        None => {
            tracing::warn!("Validation loss never improved; keeping the last model");
            model
        }
    };

    let outcome = TrainOutcome {
        state,
        epochs_run: history.len(),
        best_epoch: stopper.best_epoch(),
        best_val_loss: stopper.best_loss(),
        history,
    };
    Ok((model, outcome))
}
