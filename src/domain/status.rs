use crate::error::GuardViolation;
use serde::{Deserialize, Serialize};

/// The single authoritative lifecycle field of a submission. Forward-only,
/// except for the revision loop (under_review/reviewed -> needs_revision ->
/// pending_verification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    PendingVerification,
    Verified,
    Classified,
    AwaitingAssignment,
    UnderReview,
    Reviewed,
    NeedsRevision,
    Done,
    Decided,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::PendingVerification => "pending_verification",
            SubmissionStatus::Verified => "verified",
            SubmissionStatus::Classified => "classified",
            SubmissionStatus::AwaitingAssignment => "awaiting_assignment",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Reviewed => "reviewed",
            SubmissionStatus::NeedsRevision => "needs_revision",
            SubmissionStatus::Done => "done",
            SubmissionStatus::Decided => "decided",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending_verification" => SubmissionStatus::PendingVerification,
            "verified" => SubmissionStatus::Verified,
            "classified" => SubmissionStatus::Classified,
            "awaiting_assignment" => SubmissionStatus::AwaitingAssignment,
            "under_review" => SubmissionStatus::UnderReview,
            "reviewed" => SubmissionStatus::Reviewed,
            "needs_revision" => SubmissionStatus::NeedsRevision,
            "done" => SubmissionStatus::Done,
            "decided" => SubmissionStatus::Decided,
            _ => return None,
        })
    }

    /// Human-readable stage label; a pure function of status, never stored.
    pub fn describe(&self) -> &'static str {
        match self {
            SubmissionStatus::PendingVerification => "Awaiting document verification",
            SubmissionStatus::Verified => "Documents verified",
            SubmissionStatus::Classified => "Classified",
            SubmissionStatus::AwaitingAssignment => "Awaiting reviewer assignment",
            SubmissionStatus::UnderReview => "Under review",
            SubmissionStatus::Reviewed => "Review complete",
            SubmissionStatus::NeedsRevision => "Returned for revision",
            SubmissionStatus::Done => "Exempted from review",
            SubmissionStatus::Decided => "Decision issued",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UploadDocument,
    UpdateForm,
    VerifyDocument,
    UndoVerification,
    CompleteVerification,
    Classify,
    AssignReviewers,
    SubmitReview,
    RequestRevision,
    Resubmit,
    Decide,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::UploadDocument => "upload_document",
            Action::UpdateForm => "update_form",
            Action::VerifyDocument => "verify_document",
            Action::UndoVerification => "undo_verification",
            Action::CompleteVerification => "complete_verification",
            Action::Classify => "classify",
            Action::AssignReviewers => "assign_reviewers",
            Action::SubmitReview => "submit_review",
            Action::RequestRevision => "request_revision",
            Action::Resubmit => "resubmit",
            Action::Decide => "decide",
        }
    }
}

/// The transition table. `complete_verification` is additionally legal while
/// already `verified` so a failed consolidation can be re-run without a
/// state change; `assign_reviewers` while `under_review` carries an extra
/// no-reviews-yet guard checked by the caller against live data.
pub fn allows(status: SubmissionStatus, action: Action) -> bool {
    use Action::*;
    use SubmissionStatus::*;
    match action {
        UploadDocument | UpdateForm | VerifyDocument | UndoVerification => {
            status == PendingVerification
        }
        CompleteVerification => matches!(status, PendingVerification | Verified),
        Classify => status == Verified,
        AssignReviewers => matches!(status, AwaitingAssignment | UnderReview),
        SubmitReview => status == UnderReview,
        RequestRevision => matches!(status, UnderReview | Reviewed),
        Resubmit => status == NeedsRevision,
        Decide => status == Reviewed,
    }
}

pub fn require(status: SubmissionStatus, action: Action) -> Result<(), GuardViolation> {
    if allows(status, action) {
        Ok(())
    } else {
        Err(GuardViolation::InvalidTransition {
            status: status.as_str(),
            action: action.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Action::*;
    use SubmissionStatus::*;

    const ALL_STATUSES: [SubmissionStatus; 9] = [
        PendingVerification,
        Verified,
        Classified,
        AwaitingAssignment,
        UnderReview,
        Reviewed,
        NeedsRevision,
        Done,
        Decided,
    ];

    const ALL_ACTIONS: [Action; 11] = [
        UploadDocument,
        UpdateForm,
        VerifyDocument,
        UndoVerification,
        CompleteVerification,
        Classify,
        AssignReviewers,
        SubmitReview,
        RequestRevision,
        Resubmit,
        Decide,
    ];

    #[test]
    fn status_round_trips_through_text() {
        for s in ALL_STATUSES {
            assert_eq!(SubmissionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SubmissionStatus::parse("bogus"), None);
    }

    #[test]
    fn exact_edge_set() {
        // Every allowed (status, action) pair, nothing else.
        let allowed: &[(SubmissionStatus, Action)] = &[
            (PendingVerification, UploadDocument),
            (PendingVerification, UpdateForm),
            (PendingVerification, VerifyDocument),
            (PendingVerification, UndoVerification),
            (PendingVerification, CompleteVerification),
            (Verified, CompleteVerification),
            (Verified, Classify),
            (AwaitingAssignment, AssignReviewers),
            (UnderReview, AssignReviewers),
            (UnderReview, SubmitReview),
            (UnderReview, RequestRevision),
            (Reviewed, RequestRevision),
            (Reviewed, Decide),
            (NeedsRevision, Resubmit),
        ];

        for status in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let expected = allowed.contains(&(status, action));
                assert_eq!(
                    allows(status, action),
                    expected,
                    "{:?} / {:?}",
                    status,
                    action
                );
            }
        }
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for action in ALL_ACTIONS {
            assert!(!allows(Done, action));
            assert!(!allows(Decided, action));
        }
    }

    #[test]
    fn rejected_transition_names_status_and_action() {
        let err = require(Decided, Resubmit).unwrap_err();
        assert_eq!(
            err,
            GuardViolation::InvalidTransition {
                status: "decided",
                action: "resubmit",
            }
        );
    }
}
