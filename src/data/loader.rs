// ============================================================
// Layer 4 — Label Store
// ============================================================
// Reads the `id,label` table that ships with the training
// images, e.g.
//
//   id,label
//   f38a6374c348964dd7c7b9e3a4a1f0aa6ec2a1b4,0
//   c18f2d887b7ae4f6742ee445113fa1aef383ed77,1
//
// Every row becomes one LabeledSample. The loader is strict:
//   - a missing/unreadable file is an error
//   - a label other than 0 or 1 is an error (with line number)
//   - a repeated id is an error; the id names the image file,
//     so two rows with one id cannot both be right
//
// Reference: csv crate documentation (serde deserialisation)

use serde::Deserialize;
use std::{collections::HashSet, path::{Path, PathBuf}};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::{Label, LabeledSample};

/// Raw CSV row before validation.
#[derive(Debug, Deserialize)]
struct LabelRow {
    id:    String,
    label: u8,
}

/// Count of samples per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassDistribution {
    pub negatives: usize,
    pub positives: usize,
}

impl ClassDistribution {
    pub fn total(&self) -> usize {
        self.negatives + self.positives
    }

    /// Fraction of positive samples, 0.0 for an empty table.
    pub fn positive_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.positives as f64 / self.total() as f64
        }
    }
}

/// The full identifier → label table, in file order.
#[derive(Debug, Clone)]
pub struct LabelStore {
    source:  PathBuf,
    samples: Vec<LabeledSample>,
}

impl LabelStore {
    /// Load and validate a label CSV.
    pub fn from_csv(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let table_err = |reason: String| PipelineError::LabelTable {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| table_err(e.to_string()))?;

        let mut samples = Vec::new();
        let mut seen    = HashSet::new();

        for (row_idx, row) in reader.deserialize::<LabelRow>().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let line = row_idx + 2;
            let row  = row.map_err(|e| table_err(format!("line {line}: {e}")))?;

            let label = Label::try_from(row.label).map_err(|v| {
                table_err(format!("line {line}: label must be 0 or 1, got {v}"))
            })?;

            if !seen.insert(row.id.clone()) {
                return Err(table_err(format!("line {line}: duplicate id '{}'", row.id)));
            }

            samples.push(LabeledSample::new(row.id, label));
        }

        tracing::debug!("Read {} labels from '{}'", samples.len(), path.display());
        Ok(Self { source: path.to_path_buf(), samples })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn class_distribution(&self) -> ClassDistribution {
        self.samples.iter().fold(ClassDistribution::default(), |mut acc, s| {
            match s.label {
                Label::Negative => acc.negatives += 1,
                Label::Positive => acc.positives += 1,
            }
            acc
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("train_labels.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_reads_rows_and_distribution() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "id,label\na,0\nb,1\nc,1\nd,0\ne,0\n");

        let store = LabelStore::from_csv(&path).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.samples()[1], LabeledSample::new("b", Label::Positive));

        let dist = store.class_distribution();
        assert_eq!(dist, ClassDistribution { negatives: 3, positives: 2 });
        assert!((dist.positive_ratio() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_label_out_of_range() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "id,label\na,0\nb,2\n");

        let err = LabelStore::from_csv(&path).unwrap_err();
        assert!(matches!(err, PipelineError::LabelTable { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "id,label\na,0\na,1\n");

        let err = LabelStore::from_csv(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate id 'a'"));
    }

    #[test]
    fn test_missing_file() {
        let err = LabelStore::from_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::LabelTable { .. }));
    }

    #[test]
    fn test_header_only_is_empty() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = write_csv(&dir, "id,label\n");
        let store = LabelStore::from_csv(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.class_distribution().positive_ratio(), 0.0);
    }
}
