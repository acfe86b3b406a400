//! Reconciliation of the two extraction sources with the liveness and
//! face-match signals into final verdicts and a report.

mod engine;
pub mod report;

pub use engine::{
    COMPARED_FIELDS, DATA_APPROVAL_THRESHOLD, FieldComparison, LIVENESS_APPROVAL_THRESHOLD,
    MatchPolicy, ReconcileError, ReconciliationResult, Verdict, reconcile,
};
pub use report::Report;
