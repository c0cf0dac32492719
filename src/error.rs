use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Top-level error for every workflow operation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Bad input shape - the caller's fault
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state-machine precondition was not met
    #[error(transparent)]
    Guard(#[from] GuardViolation),

    /// Unknown submission / document / assignment id
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Blob store or renderer unavailable
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// Stored state that no longer parses (status/category/kind text)
    #[error("corrupted stored state: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Guard violations carry enough context for a specific caller message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardViolation {
    #[error("{pending} document(s) still pending and {rejected} rejected - verification is incomplete")]
    IncompleteVerification { pending: usize, rejected: usize },

    #[error("reviewer count mismatch: {}, got {got}", expected_range(.min, .max))]
    QuorumMismatch { min: usize, max: usize, got: usize },

    #[error("a review for this assignment was already submitted")]
    AlreadySubmitted,

    #[error("nothing to undo for this document")]
    NoPriorState,

    #[error("submission is {status}; {action} is not allowed from there")]
    InvalidTransition {
        status: &'static str,
        action: &'static str,
    },

    #[error("revision checklist is empty")]
    EmptyChecklist,

    #[error("revision comment is empty")]
    EmptyComment,
}

fn expected_range(min: &usize, max: &usize) -> String {
    if min == max {
        format!("expected exactly {min}")
    } else {
        format!("expected between {min} and {max}")
    }
}

impl WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Guard(_) => StatusCode::CONFLICT,
            WorkflowError::NotFound(_, _) => StatusCode::NOT_FOUND,
            WorkflowError::Dependency(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::Corrupt(_) | WorkflowError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation",
            WorkflowError::Guard(g) => match g {
                GuardViolation::IncompleteVerification { .. } => "incomplete_verification",
                GuardViolation::QuorumMismatch { .. } => "quorum_mismatch",
                GuardViolation::AlreadySubmitted => "already_submitted",
                GuardViolation::NoPriorState => "no_prior_state",
                GuardViolation::InvalidTransition { .. } => "invalid_transition",
                GuardViolation::EmptyChecklist => "empty_checklist",
                GuardViolation::EmptyComment => "empty_comment",
            },
            WorkflowError::NotFound(_, _) => "not_found",
            WorkflowError::Dependency(_) => "dependency_failure",
            WorkflowError::Corrupt(_) => "corrupted_state",
            WorkflowError::Database(_) => "database_error",
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = axum::Json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_message_distinguishes_exact_from_range() {
        let exact = GuardViolation::QuorumMismatch {
            min: 3,
            max: 3,
            got: 2,
        };
        assert_eq!(
            exact.to_string(),
            "reviewer count mismatch: expected exactly 3, got 2"
        );

        let range = GuardViolation::QuorumMismatch {
            min: 1,
            max: 7,
            got: 9,
        };
        assert_eq!(
            range.to_string(),
            "reviewer count mismatch: expected between 1 and 7, got 9"
        );
    }

    #[test]
    fn incomplete_verification_counts_surface_in_message() {
        let g = GuardViolation::IncompleteVerification {
            pending: 3,
            rejected: 1,
        };
        assert!(g.to_string().contains("3 document(s) still pending"));
        assert!(g.to_string().contains("1 rejected"));
    }
}
