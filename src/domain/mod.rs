// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that name the core
// concepts of the pipeline:
//
//   - a labelled tissue patch (id + 0/1 label)
//   - a decoded image tensor (H × W × 3, values in [0, 1])
//   - a prediction record (id + cancer probability)
//   - the classifier / checkpoint capabilities the training
//     loop is written against
//   - the error taxonomy shared by every stage
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy for every pipeline stage
pub mod error;

// A decoded, normalised image
pub mod image;

// Labelled samples and image references
pub mod sample;

// One prediction row of the submission
pub mod prediction;

// Core abstractions (traits) that other layers implement
pub mod traits;
