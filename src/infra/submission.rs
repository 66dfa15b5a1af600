// ============================================================
// Layer 6 — Submission Writer
// ============================================================
// Writes the competition file:
//
//   id,label
//   00006537328c33e284c973d7b39d340809f7271b,0.0123
//   0000ec92553fda4ce39889f9226ace43cae3364e,0.9871
//
// `label` is the predicted probability, not a rounded class.
// Rows keep the order they are given in (the sorted test-file
// listing).
//
// The rows go to `<name>.tmp` first and are renamed over the
// destination only after every row is flushed, so an error never
// leaves a half-written submission behind.

use std::path::{Path, PathBuf};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::prediction::PredictionRecord;

pub struct SubmissionWriter {
    path: PathBuf,
}

impl SubmissionWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write header + one row per record, in order.
    pub fn write(&self, records: &[PredictionRecord]) -> PipelineResult<()> {
        let tmp = self.tmp_path();

        if let Err(e) = self.write_rows(&tmp, records) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            PipelineError::write(&self.path, e)
        })?;

        tracing::info!("Wrote {} predictions to '{}'", records.len(), self.path.display());
        Ok(())
    }

    fn write_rows(&self, tmp: &Path, records: &[PredictionRecord]) -> PipelineResult<()> {
        let to_write_err = |e: csv::Error| {
            let io = match e.into_kind() {
                csv::ErrorKind::Io(io) => io,
                other => std::io::Error::new(std::io::ErrorKind::Other, format!("{other:?}")),
            };
            PipelineError::write(&self.path, io)
        };

        let mut wtr = csv::Writer::from_path(tmp).map_err(to_write_err)?;
        wtr.write_record(["id", "label"]).map_err(to_write_err)?;
        for r in records {
            wtr.write_record([r.id.as_str(), &r.probability.to_string()])
                .map_err(to_write_err)?;
        }
        wtr.flush().map_err(|e| PipelineError::write(&self.path, e))
    }
}
