// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the label table on disk to decoded image
// batches ready for the model.
//
// The pipeline flows in this order:
//
//   train_labels.csv
//       │
//       ▼
//   LabelStore        → id → 0/1 table, class distribution
//       │
//       ▼
//   SampleIndex       → id → <dir>/<id>.<ext>
//       │
//       ▼
//   split_train_val   → seeded shuffle, validation prefix
//       │
//       ▼
//   Partition         → ordered, fixed-size batches
//       │
//       ▼
//   ImageBatcher      → parallel decode (+ augmentation,
//                       + optional prefetch thread)
//       │
//       ▼
//   DecodedBatch      → handed to the training loop / predictor
//
// No Burn types appear in this layer; tensors are built from
// DecodedBatch inside ml/.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Reads the id,label CSV
pub mod loader;

/// Maps sample ids to image files, lists the test directory
pub mod index;

/// Decodes, resizes and normalises one image
pub mod preprocessor;

/// Flip / rotate augmentation for training images
pub mod augment;

/// Ordered partitions of labelled images
pub mod dataset;

/// Seeded shuffle and train/validation split
pub mod splitter;

/// Parallel batch decoding with optional prefetch
pub mod batcher;
