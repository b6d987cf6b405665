//! Report generation engine for the alumni roster.
//!
//! Turns typed roster records into paginated PDF documents: a grouped photo
//! directory, a landscape text roster with categorical statistics, the
//! in-memoriam and missing-contacts documents, and a consolidated merge of
//! the two main documents. Builds are batch and single-shot: each call
//! constructs one document start to finish with its own page state.

pub mod chart;
pub mod directory;
mod error;
pub mod fit;
pub mod generate;
pub mod memoriam;
pub mod merge;
pub mod pdf;
pub mod tabular;

pub use error::{ReportError, Result};
pub use fit::{fit_photo, BoundingBox, FittedImage, PhotoCell};
pub use generate::{
    generate_all, ArtifactSink, DiscardArtifacts, DocumentOutcome, GenerateOptions,
    GenerateSummary, OutcomeStatus, ReportPaths,
};
pub use merge::merge_documents;
pub use pdf::{save_atomic, HeaderContext, Orientation, PageWriter};
