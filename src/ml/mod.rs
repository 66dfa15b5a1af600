// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives here (plus the recorder calls in
// infra::checkpoint). The training loop and evaluator are plain
// Rust over the domain traits and never name a backend.
//
// What's in this layer:
//
//   model.rs      — CancerNet: conv blocks (conv → BN → ReLU →
//                   max-pool), global average pool, dense +
//                   dropout, one-logit output
//
//   classifier.rs — BurnClassifier: model + Adam behind the
//                   Classifier trait
//
//   evaluator.rs  — AUC, ROC curve, log-loss, confusion matrix,
//                   per-class precision/recall/F1
//
//   trainer.rs    — Epoch loop with validation, checkpointing
//                   on improvement, and early stopping
//
//   inferencer.rs — Loads a checkpoint and scores test images
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// CNN architecture and tensor conversion helpers
pub mod model;

/// Trainable Burn model behind the Classifier trait
pub mod classifier;

/// Ranking and threshold metrics
pub mod evaluator;

/// Training loop with early stopping
pub mod trainer;

/// Checkpoint loading and batched prediction
pub mod inferencer;
