// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop, evaluator and submission flow never touch
// Burn directly. They are written against these traits:
//
//   Predictor   — images in, probabilities out
//   Classifier  — a Predictor that can also take a training step
//   ModelStore  — persists the best model and reads it back
//
// Implementations:
//   - ml::classifier::BurnClassifier   → Classifier
//   - ml::inferencer::Inferencer       → Predictor
//   - infra::checkpoint::CheckpointManager → ModelStore
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::error::PipelineResult;
use crate::domain::image::ImageTensor;
use crate::domain::sample::Label;

// ─── Predictor ────────────────────────────────────────────────────────────────
/// Anything that can score a batch of images.
pub trait Predictor {
    /// One probability in [0, 1] per input image, same order.
    fn predict(&self, images: &[ImageTensor]) -> PipelineResult<Vec<f32>>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A trainable predictor. Owned and mutated only by the training loop.
pub trait Classifier: Predictor {
    /// Run one optimisation step on a batch and return its loss.
    fn train_step(&mut self, images: &[ImageTensor], labels: &[Label]) -> PipelineResult<f64>;
}

// ─── ModelStore ───────────────────────────────────────────────────────────────
/// Single-writer persistence for the best model seen so far.
pub trait ModelStore<M> {
    /// Overwrite the stored checkpoint with `model`.
    fn save_best(&self, model: &M, epoch: usize) -> PipelineResult<()>;

    /// Load the stored checkpoint into `model` and return it.
    fn load_best(&self, model: M) -> PipelineResult<M>;
}
