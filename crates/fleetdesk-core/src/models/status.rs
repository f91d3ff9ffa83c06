//! Coarse upload status reported to polling clients.
//!
//! The derived value is a projection of the two raw session columns through
//! an ordered rule table. Rules are tried top to bottom and the first match
//! wins, so the order of [`STATUS_RULES`] is part of the polling contract.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::{ProcessingStatus, UploadStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStatus {
    Pending,
    Uploading,
    Processing,
    ReadyForCompletion,
    Completed,
    ManuallyCompleted,
    Failed,
}

impl DerivedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedStatus::Pending => "pending",
            DerivedStatus::Uploading => "uploading",
            DerivedStatus::Processing => "processing",
            DerivedStatus::ReadyForCompletion => "ready_for_completion",
            DerivedStatus::Completed => "completed",
            DerivedStatus::ManuallyCompleted => "manually_completed",
            DerivedStatus::Failed => "failed",
        }
    }
}

/// One side of a rule: a wildcard or an exact column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match<T> {
    Any,
    Is(T),
}

impl<T: PartialEq> Match<T> {
    fn accepts(&self, value: &T) -> bool {
        match self {
            Match::Any => true,
            Match::Is(expected) => expected == value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusRule {
    pub upload: Match<UploadStatus>,
    pub processing: Match<ProcessingStatus>,
    pub derived: DerivedStatus,
}

const fn rule(
    upload: Match<UploadStatus>,
    processing: Match<ProcessingStatus>,
    derived: DerivedStatus,
) -> StatusRule {
    StatusRule {
        upload,
        processing,
        derived,
    }
}

pub const STATUS_RULES: &[StatusRule] = &[
    rule(
        Match::Is(UploadStatus::ManuallyCompleted),
        Match::Any,
        DerivedStatus::ManuallyCompleted,
    ),
    rule(
        Match::Is(UploadStatus::Failed),
        Match::Any,
        DerivedStatus::Failed,
    ),
    rule(
        Match::Any,
        Match::Is(ProcessingStatus::Failed),
        DerivedStatus::Failed,
    ),
    rule(
        Match::Is(UploadStatus::Completed),
        Match::Is(ProcessingStatus::Completed),
        DerivedStatus::Completed,
    ),
    rule(
        Match::Is(UploadStatus::Completed),
        Match::Any,
        DerivedStatus::Processing,
    ),
    rule(
        Match::Any,
        Match::Is(ProcessingStatus::Processing),
        DerivedStatus::Processing,
    ),
    rule(
        Match::Is(UploadStatus::ReadyForCompletion),
        Match::Any,
        DerivedStatus::ReadyForCompletion,
    ),
    rule(
        Match::Is(UploadStatus::Uploading),
        Match::Any,
        DerivedStatus::Uploading,
    ),
    rule(Match::Any, Match::Any, DerivedStatus::Pending),
];

/// Apply [`STATUS_RULES`] to a pair of raw column values.
pub fn derive_status(upload: UploadStatus, processing: ProcessingStatus) -> DerivedStatus {
    STATUS_RULES
        .iter()
        .find(|r| r.upload.accepts(&upload) && r.processing.accepts(&processing))
        .map(|r| r.derived)
        .unwrap_or(DerivedStatus::Pending)
}
