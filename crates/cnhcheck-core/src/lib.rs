//! Core types for CNH verification: identity records, field normalisation,
//! extraction payload mapping, and step outcomes.

pub mod extraction;
pub mod normalize;
pub mod outcome;
pub mod record;
pub mod score;

pub use extraction::{RawField, RawPayload, RawResult, build_record};
pub use normalize::{normalize, normalize_opt};
pub use outcome::{StepOutcome, StepStatus};
pub use record::{
    DocumentSource, ExtractedIdentityRecord, ExtractionQuality, IdentityField, QrDetails,
};
pub use score::{probability_to_percent, round2};
