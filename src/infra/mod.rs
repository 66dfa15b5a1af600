// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything the pipeline writes to disk:
//
//   checkpoint.rs — Model weights and training config
//                   CompactRecorder records for the best model
//                   and its backbone; TrainConfig as JSON so
//                   `predict` can rebuild the architecture.
//                   Implements the ModelStore trait used by the
//                   training loop.
//
//   metrics.rs    — Per-epoch metrics CSV, plus the final
//                   evaluation report (JSON) and ROC curve (CSV)
//
//   submission.rs — The `id,label` submission file, written
//                   through a temp file and renamed into place
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics and evaluation artifacts
pub mod metrics;

/// Submission CSV writer
pub mod submission;
