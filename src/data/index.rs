// ============================================================
// Layer 4 — Sample Index
// ============================================================
// Turns label rows into image references:
//
//   LabeledSample { id: "f38a…", label: 0 }
//       + train dir "data/train" + ext "tif"
//       → LabeledImage { path: "data/train/f38a….tif", label: 0 }
//
// The test set has no label table, so it is indexed by listing
// the directory instead. Files are sorted lexicographically by
// name, and the submission keeps that order.
//
// Files are not opened here. A missing image surfaces later as
// a DecodeError carrying the sample id.

use std::{fs, path::{Path, PathBuf}};

use crate::data::loader::LabelStore;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::{ImageRef, LabeledImage};

/// Maps sample ids to files in one image directory.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    dir: PathBuf,
    ext: String,
}

impl SampleIndex {
    pub fn new(dir: impl Into<PathBuf>, ext: impl Into<String>) -> Self {
        let ext: String = ext.into();
        Self {
            dir: dir.into(),
            ext: ext.trim_start_matches('.').to_string(),
        }
    }

    /// `<dir>/<id>.<ext>`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{}", self.ext))
    }

    /// One LabeledImage per label row, in table order.
    pub fn labeled(&self, store: &LabelStore) -> Vec<LabeledImage> {
        store
            .samples()
            .iter()
            .map(|s| LabeledImage {
                image: ImageRef::new(s.id.clone(), self.path_for(&s.id)),
                label: s.label,
            })
            .collect()
    }

    /// Every `*.<ext>` file in the directory, sorted by file name.
    /// The id of each image is its file stem.
    pub fn list_unlabeled(&self) -> PipelineResult<Vec<ImageRef>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            PipelineError::config(format!("cannot list '{}': {e}", self.dir.display()))
        })?;

        let mut images = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PipelineError::config(format!("cannot list '{}': {e}", self.dir.display()))
            })?;
            let path = entry.path();
            if !path.is_file() || !has_extension(&path, &self.ext) {
                continue;
            }
            // a non UTF-8 id has no submission row
            let id = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                PipelineError::config(format!(
                    "test image '{}' has a non UTF-8 file name",
                    path.display()
                ))
            })?;
            images.push(ImageRef::new(id.to_string(), path.clone()));
        }

        images.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        tracing::debug!("Found {} images in '{}'", images.len(), self.dir.display());
        Ok(images)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Label;

    #[test]
    fn test_labeled_paths_follow_ids() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("labels.csv");
        fs::write(&csv, "id,label\nabc,1\ndef,0\n").unwrap();
        let store = LabelStore::from_csv(&csv).unwrap();
        let index  = SampleIndex::new("data/train", ".tif");
        let images = index.labeled(&store);

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].image.path, PathBuf::from("data/train/abc.tif"));
        assert_eq!(images[1].label, Label::Negative);
    }

    #[test]
    fn test_unlabeled_listing_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.tif", "a.tif", "b.TIF", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.tif")).unwrap();

        let images = SampleIndex::new(dir.path(), "tif").list_unlabeled().unwrap();
        let ids: Vec<&str> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_an_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tif"), b"").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.tif")), b"").unwrap();

        let err = SampleIndex::new(dir.path(), "tif").list_unlabeled().unwrap_err();
        match err {
            PipelineError::Configuration(msg) => assert!(msg.contains("bad"), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let err = SampleIndex::new("/no/such/test/dir", "tif").list_unlabeled().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
