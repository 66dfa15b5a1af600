// ============================================================
// Layer 4 — Train/Validation Partitioner
// ============================================================
// Shuffles all samples once with a seeded RNG, then cuts the
// shuffled list in two:
//
//   [ validation: ⌊N·f⌋ samples | training: N − ⌊N·f⌋ samples ]
//
// The validation set is the PREFIX. With f = 0.2 and N = 10
// that is 2 validation and 8 training samples.
//
// Why seed the shuffle?
//   The split decides which images the model never trains on.
//   A fixed seed makes two runs with the same config use the
//   same validation set, so their scores are comparable.
//
// The shuffle happens once. Epochs do not reshuffle.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: rand crate documentation (StdRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::{Partition, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::LabeledImage;

/// Default share of samples held out for validation.
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

/// Number of validation samples for `total` samples and fraction `f`.
pub fn validation_size(total: usize, validation_fraction: f64) -> usize {
    ((total as f64) * validation_fraction).floor() as usize
}

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// # Errors
/// `Configuration` if `validation_fraction` is outside [0, 1) or
/// `samples` is empty.
pub fn split_train_val(
    mut samples:         Vec<LabeledImage>,
    validation_fraction: f64,
    seed:                u64,
) -> PipelineResult<Partitions> {
    if !(0.0..1.0).contains(&validation_fraction) {
        return Err(PipelineError::config(format!(
            "validation fraction must be in [0, 1), got {validation_fraction}"
        )));
    }
    if samples.is_empty() {
        return Err(PipelineError::config("cannot partition an empty dataset"));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let val_size = validation_size(total, validation_fraction).min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let train = samples.split_off(val_size);
    let validation = samples;

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed {})",
        train.len(),
        validation.len(),
        seed,
    );

    Ok(Partitions {
        train:      Partition::new(train),
        validation: Partition::new(validation),
    })
}
