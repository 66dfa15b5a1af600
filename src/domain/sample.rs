// ============================================================
// Layer 3 — Sample Domain Types
// ============================================================
// A training sample is nothing more than an id and a binary
// label. The id determines the image file name, so once the
// image directory and extension are known the sample can be
// turned into an `ImageRef` pointing at `<dir>/<id>.<ext>`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Binary tissue label: 0 = no tumour tissue, 1 = tumour tissue
/// in the centre region of the patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    pub fn is_positive(self) -> bool {
        self == Label::Positive
    }
}

impl TryFrom<u8> for Label {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(other),
        }
    }
}

/// One row of the label table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub id:    String,
    pub label: Label,
}

impl LabeledSample {
    pub fn new(id: impl Into<String>, label: Label) -> Self {
        Self { id: id.into(), label }
    }
}

/// Where to find the image for a given sample id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub id:   String,
    pub path: PathBuf,
}

impl ImageRef {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { id: id.into(), path: path.into() }
    }
}

/// An image reference paired with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledImage {
    pub image: ImageRef,
    pub label: Label,
}

impl LabeledImage {
    pub fn id(&self) -> &str {
        &self.image.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_u8() {
        assert_eq!(Label::try_from(0), Ok(Label::Negative));
        assert_eq!(Label::try_from(1), Ok(Label::Positive));
        assert_eq!(Label::try_from(2), Err(2));
    }
}
