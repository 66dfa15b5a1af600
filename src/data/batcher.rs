// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Converts a slice of LabeledImages into a DecodedBatch:
//
//   Input:  [LabeledImage; N]   (paths + labels)
//   Output: DecodedBatch { ids, images: [ImageTensor; N], labels }
//
// Decoding fans out over rayon's thread pool. The indexed
// parallel iterator keeps the output in input order, so
// images[i] always belongs to labels[i].
//
// Prefetching:
//   With prefetch depth d > 0 a scoped producer thread decodes
//   up to d batches ahead of the consumer and hands them over a
//   bounded channel. The consumer (training loop) stays on the
//   calling thread and is the only code touching the model.
//   If the consumer stops early the receiver is dropped, the
//   producer's next send fails and it exits.
//
// Reference: rayon documentation (ParallelIterator::collect)
//            Rust Book §16 (Message Passing)

use rayon::prelude::*;
use std::sync::mpsc;

use crate::data::augment::Augmentation;
use crate::data::dataset::Partition;
use crate::data::preprocessor::ImagePreprocessor;
use crate::domain::error::PipelineResult;
use crate::domain::image::ImageTensor;
use crate::domain::sample::{ImageRef, Label, LabeledImage};

// ─── DecodedBatch ─────────────────────────────────────────────────────────────
/// A batch of decoded images with parallel ids and labels.
#[derive(Debug, Clone)]
pub struct DecodedBatch {
    pub ids:    Vec<String>,
    pub images: Vec<ImageTensor>,
    pub labels: Vec<Label>,
}

impl DecodedBatch {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Whether a batch is used for a training step (augmented) or
/// for evaluation (decoded as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Train { epoch: usize },
    Eval,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct ImageBatcher {
    preprocessor: ImagePreprocessor,
    augmentation: Option<Augmentation>,
    prefetch:     usize,
}

impl ImageBatcher {
    pub fn new(preprocessor: ImagePreprocessor) -> Self {
        Self { preprocessor, augmentation: None, prefetch: 0 }
    }

    /// Augment training batches with `augmentation`.
    pub fn with_augmentation(mut self, augmentation: Option<Augmentation>) -> Self {
        self.augmentation = augmentation;
        self
    }

    /// Decode up to `depth` batches ahead of the consumer.
    pub fn with_prefetch(mut self, depth: usize) -> Self {
        self.prefetch = depth;
        self
    }

    /// Decode unlabeled images in order, no augmentation.
    pub fn decode_images(&self, images: &[ImageRef]) -> PipelineResult<Vec<ImageTensor>> {
        images
            .par_iter()
            .map(|img| self.preprocessor.decode(img))
            .collect()
    }

    /// Decode one batch. `offset` is the position of `items[0]`
    /// within its partition; it keys the augmentation RNG.
    pub fn load(
        &self,
        items:  &[LabeledImage],
        mode:   BatchMode,
        offset: usize,
    ) -> PipelineResult<DecodedBatch> {
        let augmentation = match mode {
            BatchMode::Train { epoch } => self.augmentation.map(|a| (a, epoch)),
            BatchMode::Eval => None,
        };

        let images: Vec<ImageTensor> = items
            .par_iter()
            .enumerate()
            .map(|(i, item)| {
                let tensor = self.preprocessor.decode(&item.image)?;
                Ok(match augmentation {
                    Some((aug, epoch)) => aug.apply(&tensor, epoch, offset + i),
                    None => tensor,
                })
            })
            .collect::<PipelineResult<_>>()?;

        Ok(DecodedBatch {
            ids:    items.iter().map(|s| s.image.id.clone()).collect(),
            images,
            labels: items.iter().map(|s| s.label).collect(),
        })
    }

    /// Decode every batch of `partition` in order and hand each to
    /// `consume`. Stops at the first decode or consumer error.
    pub fn for_each_batch<F>(
        &self,
        partition:   &Partition,
        batch_size:  usize,
        mode:        BatchMode,
        mut consume: F,
    ) -> PipelineResult<()>
    where
        F: FnMut(DecodedBatch) -> PipelineResult<()>,
    {
        let batch_size = batch_size.max(1);

        if self.prefetch == 0 {
            for (i, chunk) in partition.batches(batch_size).enumerate() {
                consume(self.load(chunk, mode, i * batch_size)?)?;
            }
            return Ok(());
        }

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::sync_channel::<PipelineResult<DecodedBatch>>(self.prefetch);

            scope.spawn(move || {
                for (i, chunk) in partition.batches(batch_size).enumerate() {
                    let batch  = self.load(chunk, mode, i * batch_size);
                    let failed = batch.is_err();
                    if tx.send(batch).is_err() || failed {
                        break;
                    }
                }
            });

            for batch in rx {
                consume(batch?)?;
            }
            Ok(())
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::PipelineError;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn write_samples(dir: &Path, n: usize) -> Partition {
        let samples = (0..n)
            .map(|i| {
                let shade = (i * 20 % 256) as u8;
                let path  = dir.join(format!("s{i}.png"));
                RgbImage::from_pixel(12, 12, Rgb([shade, shade, shade])).save(&path).unwrap();
                LabeledImage {
                    image: ImageRef::new(format!("s{i}"), path),
                    label: if i % 2 == 0 { Label::Negative } else { Label::Positive },
                }
            })
            .collect();
        Partition::new(samples)
    }

    fn batcher() -> ImageBatcher {
        ImageBatcher::new(ImagePreprocessor::square(8))
    }

    #[test]
    fn test_load_keeps_order_and_labels_aligned() {
        let dir   = tempfile::tempdir().unwrap();
        let part  = write_samples(dir.path(), 6);
        let batch = batcher().load(part.samples(), BatchMode::Eval, 0).unwrap();

        assert_eq!(batch.len(), 6);
        assert_eq!(batch.ids, vec!["s0", "s1", "s2", "s3", "s4", "s5"]);
        assert_eq!(batch.labels, part.labels());
        // each image is a flat shade that identifies its sample
        for (i, img) in batch.images.iter().enumerate() {
            let expected = (i * 20 % 256) as f32 / 255.0;
            assert!((img.get(3, 3, 0) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_image_aborts_batch() {
        let dir  = tempfile::tempdir().unwrap();
        let part = write_samples(dir.path(), 3);
        let mut items = part.samples().to_vec();
        items.push(LabeledImage {
            image: ImageRef::new("lost", dir.path().join("lost.png")),
            label: Label::Positive,
        });

        let err = batcher().load(&items, BatchMode::Eval, 0).unwrap_err();
        match err {
            PipelineError::Decode { id, .. } => assert_eq!(id, "lost"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_prefetch_yields_every_batch_in_order() {
        let dir  = tempfile::tempdir().unwrap();
        let part = write_samples(dir.path(), 11);

        for depth in [0, 1, 3] {
            let mut seen = Vec::new();
            batcher()
                .with_prefetch(depth)
                .for_each_batch(&part, 4, BatchMode::Eval, |b| {
                    seen.extend(b.ids);
                    Ok(())
                })
                .unwrap();
            let expected: Vec<String> = (0..11).map(|i| format!("s{i}")).collect();
            assert_eq!(seen, expected, "prefetch depth {depth}");
        }
    }

    #[test]
    fn test_consumer_error_stops_iteration() {
        let dir  = tempfile::tempdir().unwrap();
        let part = write_samples(dir.path(), 10);

        let mut calls = 0;
        let result = batcher().with_prefetch(2).for_each_batch(&part, 2, BatchMode::Eval, |_| {
            calls += 1;
            if calls == 2 {
                Err(PipelineError::Model("boom".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_eval_mode_never_augments() {
        let dir  = tempfile::tempdir().unwrap();
        let part = write_samples(dir.path(), 4);
        let aug  = batcher().with_augmentation(Some(Augmentation::all(5)));

        let plain = batcher().load(part.samples(), BatchMode::Eval, 0).unwrap();
        let eval  = aug.load(part.samples(), BatchMode::Eval, 0).unwrap();
        assert_eq!(plain.images, eval.images);
    }
}
