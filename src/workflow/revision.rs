// The revision cycle: flag documents back to the researcher, then re-enter
// verification on resubmission.
use crate::db::{self, DocumentRow, RevisionRequest, Submission};
use crate::domain::documents::DocumentKind;
use crate::domain::status::{self, Action, SubmissionStatus};
use crate::error::{GuardViolation, WorkflowError};
use crate::state::AppState;
use crate::storage::{blob_path, new_id, BlobStore};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Flags a set of document kinds for rework. Checklist and comment are both
/// mandatory; the submission drops out of the review path until it is
/// resubmitted.
pub async fn request_revision(
    state: &AppState,
    submission_id: &str,
    staff_id: &str,
    checklist: Vec<DocumentKind>,
    comment: &str,
) -> Result<Submission, WorkflowError> {
    if checklist.is_empty() {
        return Err(GuardViolation::EmptyChecklist.into());
    }
    if comment.trim().is_empty() {
        return Err(GuardViolation::EmptyComment.into());
    }

    let kinds: BTreeSet<DocumentKind> = checklist.into_iter().collect();
    for kind in &kinds {
        if !kind.requires_verification() {
            return Err(WorkflowError::Validation(format!(
                "{} is system-generated and cannot be flagged for revision",
                kind.as_str()
            )));
        }
    }

    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::RequestRevision)?;

    let checklist_json = serde_json::to_string(
        &kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
    )
    .map_err(|e| WorkflowError::Corrupt(e.to_string()))?;

    db::insert_revision_request(
        &mut *tx,
        &RevisionRequest {
            id: new_id(),
            submission_id: submission_id.to_string(),
            cycle: submission.cycle,
            checklist: checklist_json,
            comment: comment.to_string(),
            requested_at: Utc::now(),
            requested_by: staff_id.to_string(),
        },
    )
    .await?;
    db::update_status(
        &mut *tx,
        submission_id,
        SubmissionStatus::NeedsRevision.as_str(),
    )
    .await?;
    tx.commit().await?;

    info!(
        "{} returned {} for revision ({} document(s) flagged)",
        staff_id,
        submission.tracking_code,
        kinds.len()
    );

    db::get_submission(state.pool.as_ref(), submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))
}

#[derive(Debug, Serialize)]
pub struct ResubmitOutcome {
    pub status: SubmissionStatus,
    pub cycle: i32,
    pub replaced: Vec<DocumentKind>,
}

/// Accepts replacements for exactly the flagged kinds. Each replacement
/// becomes a new document version with its verification reset; everything
/// else keeps its verification state, and the submission re-enters the
/// pipeline at pending_verification. Prior assignments, reviews and blobs
/// stay untouched as history.
pub async fn resubmit(
    state: &AppState,
    submission_id: &str,
    replacements: Vec<(DocumentKind, Vec<u8>)>,
) -> Result<ResubmitOutcome, WorkflowError> {
    let provided: BTreeSet<DocumentKind> = replacements.iter().map(|(k, _)| *k).collect();
    if provided.len() != replacements.len() {
        return Err(WorkflowError::Validation(
            "duplicate replacement kinds in upload".into(),
        ));
    }

    // Validate every file before touching any state.
    let mut checked: Vec<(DocumentKind, Vec<u8>)> = Vec::new();
    for (kind, bytes) in replacements {
        if bytes.is_empty() {
            return Err(WorkflowError::Validation(format!(
                "replacement for {} is empty",
                kind.as_str()
            )));
        }
        let bytes = tokio::task::spawn_blocking(move || {
            lopdf::Document::load_mem(&bytes)
                .map(|_| bytes)
                .map_err(|e| {
                    WorkflowError::Validation(format!("replacement is not a readable PDF: {e}"))
                })
        })
        .await
        .map_err(|e| WorkflowError::Dependency(format!("inspect task: {e}")))??;
        checked.push((kind, bytes));
    }

    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::Resubmit)?;

    let request = db::latest_revision_request(&mut *tx, submission_id)
        .await?
        .ok_or_else(|| {
            WorkflowError::Corrupt(format!(
                "submission {submission_id} needs revision but has no revision request"
            ))
        })?;
    let required: BTreeSet<DocumentKind> = request.kinds()?.into_iter().collect();

    if provided != required {
        let missing: Vec<&str> = required
            .difference(&provided)
            .map(|k| k.as_str())
            .collect();
        let extra: Vec<&str> = provided
            .difference(&required)
            .map(|k| k.as_str())
            .collect();
        return Err(WorkflowError::Validation(format!(
            "replacements must cover exactly the flagged documents (missing: [{}], unexpected: [{}])",
            missing.join(", "),
            extra.join(", ")
        )));
    }

    let now = Utc::now();
    let mut replaced = Vec::new();
    for (kind, bytes) in checked {
        let version = db::next_document_version(&mut *tx, submission_id, kind.as_str()).await?;
        let path = blob_path(submission_id, kind.as_str(), version);
        state
            .blobs
            .put(&path, &bytes)
            .map_err(|e| WorkflowError::Dependency(format!("blob store: {e}")))?;
        db::insert_document(
            &mut *tx,
            &DocumentRow {
                id: new_id(),
                submission_id: submission_id.to_string(),
                kind: kind.as_str().to_string(),
                version,
                blob_ref: path,
                size: bytes.len() as i64,
                uploaded_at: now,
                is_verified: None,
                comment: String::new(),
                prev_is_verified: None,
                prev_comment: None,
                has_prev: false,
            },
        )
        .await?;
        replaced.push(kind);
    }

    let new_cycle = submission.cycle + 1;
    db::mark_resubmitted(
        &mut *tx,
        submission_id,
        SubmissionStatus::PendingVerification.as_str(),
        new_cycle,
        now,
    )
    .await?;
    tx.commit().await?;

    info!(
        "{} resubmitted (cycle {}), {} document(s) replaced",
        submission.tracking_code,
        new_cycle,
        replaced.len()
    );

    Ok(ResubmitOutcome {
        status: SubmissionStatus::PendingVerification,
        cycle: new_cycle,
        replaced,
    })
}
