// Review collection: one review per assignment, quorum watching.
use crate::db::{self, Review};
use crate::domain::status::{self, Action, SubmissionStatus};
use crate::error::{GuardViolation, WorkflowError};
use crate::state::AppState;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    MinorRevision,
    MajorRevision,
    Disapprove,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::MinorRevision => "minor_revision",
            Recommendation::MajorRevision => "major_revision",
            Recommendation::Disapprove => "disapprove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "approve" => Recommendation::Approve,
            "minor_revision" => Recommendation::MinorRevision,
            "major_revision" => Recommendation::MajorRevision,
            "disapprove" => Recommendation::Disapprove,
            _ => return None,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewOutcome {
    pub completed: usize,
    pub required: usize,
    pub submission_status: SubmissionStatus,
}

/// Seals one reviewer's assessment. The review that completes the quorum
/// flips the submission to reviewed and stamps reviewed_at.
pub async fn submit_review(
    state: &AppState,
    assignment_id: &str,
    reviewer_id: &str,
    recommendation: Recommendation,
    remarks: &str,
) -> Result<ReviewOutcome, WorkflowError> {
    // Resolve the owning submission first, then take its lock and re-read.
    let assignment = db::get_assignment(state.pool.as_ref(), assignment_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("assignment", assignment_id.to_string()))?;

    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, &assignment.submission_id)
        .await?
        .ok_or_else(|| {
            WorkflowError::NotFound("submission", assignment.submission_id.clone())
        })?;
    status::require(submission.status()?, Action::SubmitReview)?;

    let assignment = db::get_assignment(&mut *tx, assignment_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("assignment", assignment_id.to_string()))?;
    if assignment.cycle != submission.cycle {
        return Err(WorkflowError::Validation(
            "assignment belongs to a previous review cycle".into(),
        ));
    }
    if assignment.reviewer_id != reviewer_id {
        return Err(WorkflowError::Validation(
            "assignment belongs to a different reviewer".into(),
        ));
    }
    if db::get_review_by_assignment(&mut *tx, assignment_id)
        .await?
        .is_some()
    {
        return Err(GuardViolation::AlreadySubmitted.into());
    }

    let now = Utc::now();
    db::insert_review(
        &mut *tx,
        &Review {
            id: crate::storage::new_id(),
            assignment_id: assignment_id.to_string(),
            submission_id: submission.id.clone(),
            recommendation: recommendation.as_str().to_string(),
            remarks: remarks.to_string(),
            status: "submitted".to_string(),
            submitted_at: now,
        },
    )
    .await?;
    db::mark_assignment_completed(&mut *tx, assignment_id, now).await?;

    let required = db::assignments_for_cycle(&mut *tx, &submission.id, submission.cycle)
        .await?
        .len();
    let completed = db::reviews_for_cycle(&mut *tx, &submission.id, submission.cycle)
        .await?
        .len();

    let submission_status = if completed >= required {
        db::set_reviewed(
            &mut *tx,
            &submission.id,
            SubmissionStatus::Reviewed.as_str(),
            now,
        )
        .await?;
        SubmissionStatus::Reviewed
    } else {
        SubmissionStatus::UnderReview
    };
    tx.commit().await?;

    info!(
        "review {}/{} submitted for {} ({})",
        completed,
        required,
        submission.tracking_code,
        recommendation.as_str()
    );

    Ok(ReviewOutcome {
        completed,
        required,
        submission_status,
    })
}

/// (completed, required) for the submission's current cycle. Required is the
/// number of assignments actually created for the cycle.
pub async fn completion_ratio<'e, E>(
    exec: E,
    submission_id: &str,
    cycle: i32,
) -> Result<(usize, usize), sqlx::Error>
where
    E: PgExecutor<'e> + Copy,
{
    let required = db::assignments_for_cycle(exec, submission_id, cycle)
        .await?
        .len();
    let completed = db::reviews_for_cycle(exec, submission_id, cycle).await?.len();
    Ok((completed, required))
}
