// ============================================================
// Layer 2 — StatsUseCase
// ============================================================
// Reads the label table and reports its size and class balance.
// Useful before training to pick a validation fraction that
// leaves both classes in the validation set.

use anyhow::{Context, Result};

use crate::data::loader::{ClassDistribution, LabelStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStats {
    pub rows:         usize,
    pub distribution: ClassDistribution,
}

pub struct StatsUseCase {
    labels_csv: String,
}

impl StatsUseCase {
    pub fn new(labels_csv: impl Into<String>) -> Self {
        Self { labels_csv: labels_csv.into() }
    }

    pub fn execute(&self) -> Result<LabelStats> {
        let store = LabelStore::from_csv(&self.labels_csv).context("loading label table")?;
        let distribution = store.class_distribution();
        tracing::debug!("Read {} rows from '{}'", store.len(), store.source().display());
        Ok(LabelStats { rows: store.len(), distribution })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_rows_and_classes() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "id,label\na,0\nb,1\nc,0\nd,0\n").unwrap();

        let stats = StatsUseCase::new(path.display().to_string()).execute().unwrap();
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.distribution.negatives, 3);
        assert_eq!(stats.distribution.positives, 1);
        assert!((stats.distribution.positive_ratio() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_table_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "id,label\na,7\n").unwrap();
        assert!(StatsUseCase::new(path.display().to_string()).execute().is_err());
    }
}
