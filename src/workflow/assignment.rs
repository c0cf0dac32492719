// Reviewer assignment: quorum-guarded, per-cycle, upsert semantics.
use crate::db::{self, ReviewerAssignment};
use crate::domain::classify::ReviewCategory;
use crate::domain::status::{self, Action, SubmissionStatus};
use crate::error::{GuardViolation, WorkflowError};
use crate::state::AppState;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct AssignmentOutcome {
    pub updated: usize,
    pub inserted: usize,
    pub required_reviews: usize,
    pub due_date: NaiveDate,
}

/// Binds the given reviewers to the submission's current cycle. The incoming
/// id list becomes the cycle's assignment set: existing bindings get the new
/// due date, new ones are inserted, stale ones are removed. Only legal until
/// the first review of the cycle is submitted.
pub async fn assign_reviewers(
    state: &AppState,
    submission_id: &str,
    secretariat_id: &str,
    reviewer_ids: Vec<String>,
    due_date: NaiveDate,
) -> Result<AssignmentOutcome, WorkflowError> {
    let mut ids = reviewer_ids;
    ids.sort();
    let before = ids.len();
    ids.dedup();
    if ids.len() != before {
        return Err(WorkflowError::Validation(
            "reviewer_ids contains duplicates".into(),
        ));
    }
    if due_date < Utc::now().date_naive() {
        return Err(WorkflowError::Validation("due_date is in the past".into()));
    }

    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    let current_status = submission.status()?;
    status::require(current_status, Action::AssignReviewers)?;

    if current_status == SubmissionStatus::UnderReview {
        let reviews = db::reviews_for_cycle(&mut *tx, submission_id, submission.cycle).await?;
        if !reviews.is_empty() {
            return Err(GuardViolation::InvalidTransition {
                status: current_status.as_str(),
                action: Action::AssignReviewers.as_str(),
            }
            .into());
        }
    }

    let category = submission.category()?.ok_or_else(|| {
        WorkflowError::Corrupt(format!("submission {submission_id} awaits assignment unclassified"))
    })?;
    if category == ReviewCategory::Exempted {
        return Err(GuardViolation::InvalidTransition {
            status: current_status.as_str(),
            action: Action::AssignReviewers.as_str(),
        }
        .into());
    }

    let pool_size = db::list_active_reviewers(&mut *tx).await?.len();
    let (min, max) = category.quorum_bounds(pool_size);
    if ids.len() < min || ids.len() > max {
        return Err(GuardViolation::QuorumMismatch {
            min,
            max,
            got: ids.len(),
        }
        .into());
    }

    let found = db::find_reviewers(&mut *tx, &ids).await?;
    for id in &ids {
        let reviewer = found
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| WorkflowError::NotFound("reviewer", id.clone()))?;
        if !reviewer.active {
            return Err(WorkflowError::Validation(format!(
                "reviewer {} is not in the active pool",
                reviewer.name
            )));
        }
    }

    let existing = db::assignments_for_cycle(&mut *tx, submission_id, submission.cycle).await?;
    db::delete_assignments_not_in(&mut *tx, submission_id, submission.cycle, &ids).await?;

    let mut updated = 0;
    let mut inserted = 0;
    for reviewer_id in &ids {
        match existing.iter().find(|a| &a.reviewer_id == reviewer_id) {
            Some(assignment) => {
                db::update_assignment_due_date(&mut *tx, &assignment.id, due_date).await?;
                updated += 1;
            }
            None => {
                db::insert_assignment(
                    &mut *tx,
                    &ReviewerAssignment {
                        id: crate::storage::new_id(),
                        submission_id: submission_id.to_string(),
                        reviewer_id: reviewer_id.clone(),
                        cycle: submission.cycle,
                        status: "assigned".to_string(),
                        assigned_at: Utc::now(),
                        due_date,
                        completed_at: None,
                    },
                )
                .await?;
                inserted += 1;
            }
        }
    }

    if current_status == SubmissionStatus::AwaitingAssignment {
        db::update_status(
            &mut *tx,
            submission_id,
            SubmissionStatus::UnderReview.as_str(),
        )
        .await?;
    }
    tx.commit().await?;

    info!(
        "{} assigned {} reviewer(s) to {} (cycle {}): {} updated, {} inserted",
        secretariat_id,
        ids.len(),
        submission_id,
        submission.cycle,
        updated,
        inserted
    );

    Ok(AssignmentOutcome {
        updated,
        inserted,
        required_reviews: ids.len(),
        due_date,
    })
}

/// Reviewers from earlier cycles of this submission, offered to the
/// secretariat as a default selection when re-assigning after a revision.
pub async fn past_reviewers(
    state: &AppState,
    submission_id: &str,
) -> Result<Vec<String>, WorkflowError> {
    let submission = db::get_submission(state.pool.as_ref(), submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    Ok(db::past_reviewer_ids(state.pool.as_ref(), submission_id, submission.cycle).await?)
}
