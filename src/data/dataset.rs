use crate::domain::sample::{Label, LabeledImage};

/// An ordered, finite set of labelled images that is consumed in
/// fixed-size batches (the last batch may be shorter).
///
/// The order is fixed when the partition is built; iterating twice
/// yields the same batches in the same order.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    samples: Vec<LabeledImage>,
}

impl Partition {
    pub fn new(samples: Vec<LabeledImage>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledImage] {
        &self.samples
    }

    pub fn labels(&self) -> Vec<Label> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Consecutive batches of at most `batch_size` samples.
    /// A batch size of 0 is treated as 1.
    pub fn batches(&self, batch_size: usize) -> std::slice::Chunks<'_, LabeledImage> {
        self.samples.chunks(batch_size.max(1))
    }

    pub fn batch_count(&self, batch_size: usize) -> usize {
        self.samples.len().div_ceil(batch_size.max(1))
    }
}

/// The train / validation pair produced by the partitioner.
#[derive(Debug, Clone)]
pub struct Partitions {
    pub train:      Partition,
    pub validation: Partition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::ImageRef;

    fn partition(n: usize) -> Partition {
        Partition::new(
            (0..n)
                .map(|i| LabeledImage {
                    image: ImageRef::new(i.to_string(), format!("{i}.tif")),
                    label: if i % 2 == 0 { Label::Negative } else { Label::Positive },
                })
                .collect(),
        )
    }

    #[test]
    fn test_batches_cover_every_sample_in_order() {
        let p = partition(10);
        let sizes: Vec<usize> = p.batches(4).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(p.batch_count(4), 3);

        let ids: Vec<&str> = p.batches(4).flatten().map(|s| s.id()).collect();
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_partition_has_no_batches() {
        let p = Partition::default();
        assert_eq!(p.batches(8).count(), 0);
        assert_eq!(p.batch_count(8), 0);
    }
}
