// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer composes the pipeline stages for one goal:
//
//   train_use_case   — labels → partitions → fit → evaluate
//   predict_use_case — checkpoint → score test dir → submission
//   stats_use_case   — label table summary
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Errors are anyhow, with context naming the failing stage
//
// The backend is a run-time choice. Each use case dispatches once
// to a generic `run::<B>()` so everything below is monomorphised
// for the chosen backend.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

use serde::{Deserialize, Serialize};

/// The training workflow
pub mod train_use_case;

/// Submission generation for the test directory
pub mod predict_use_case;

/// Label table statistics
pub mod stats_use_case;

/// Which burn backend runs the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GPU via wgpu (Vulkan / Metal / DX12)
    #[default]
    Wgpu,
    /// CPU via ndarray
    NdArray,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Wgpu    => write!(f, "wgpu"),
            BackendKind::NdArray => write!(f, "ndarray"),
        }
    }
}
