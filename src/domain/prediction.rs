use serde::{Deserialize, Serialize};

/// Predicted cancer probability for one test image.
/// Written to the submission table and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id:          String,
    pub probability: f32,
}

impl PredictionRecord {
    pub fn new(id: impl Into<String>, probability: f32) -> Self {
        Self { id: id.into(), probability }
    }
}
