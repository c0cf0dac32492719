// The submission state machine: every mutation locks its submission row,
// checks the transition table, then applies the effect.
pub mod assignment;
pub mod reviews;
pub mod revision;

use crate::db::{self, DocumentRow, DraftRow, Submission};
use crate::domain::classify::ReviewCategory;
use crate::domain::documents::{
    DocumentKind, VerificationSet, ATTACHMENT_KINDS, GENERATED_KINDS,
};
use crate::domain::draft::{DraftStep, DraftSubmission};
use crate::domain::history::{self, HistoryEvent};
use crate::domain::status::{self, Action, SubmissionStatus};
use crate::error::{GuardViolation, WorkflowError};
use crate::pdf::{self, CertificateKind, ConsolidationPart};
use crate::state::AppState;
use crate::storage::{blob_path, new_id, tracking_code, BlobStore, SIGNED_URL_TTL_SECS};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Disapproved,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Disapproved => "disapproved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "approved" => Decision::Approved,
            "disapproved" => Decision::Disapproved,
            _ => return None,
        })
    }
}

// --- drafts ---

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub id: String,
    pub researcher_id: String,
    pub draft: DraftSubmission,
    pub missing_steps: Vec<DocumentKind>,
    pub ready: bool,
}

fn draft_view(row: DraftRow, draft: DraftSubmission) -> DraftView {
    DraftView {
        id: row.id,
        researcher_id: row.researcher_id,
        missing_steps: draft.missing_steps(),
        ready: draft.ready(),
        draft,
    }
}

fn parse_draft(row: &DraftRow) -> Result<DraftSubmission, WorkflowError> {
    let mut draft: DraftSubmission = serde_json::from_str(&row.payload)
        .map_err(|e| WorkflowError::Corrupt(format!("bad draft payload: {e}")))?;
    draft.title = row.title.clone();
    Ok(draft)
}

pub async fn create_draft(
    state: &AppState,
    researcher_id: String,
    title: String,
) -> Result<DraftView, WorkflowError> {
    if researcher_id.trim().is_empty() {
        return Err(WorkflowError::Validation("researcher_id is required".into()));
    }

    let draft = DraftSubmission {
        title: title.clone(),
        ..Default::default()
    };
    let row = DraftRow {
        id: new_id(),
        researcher_id,
        title,
        payload: serde_json::to_string(&draft)
            .map_err(|e| WorkflowError::Corrupt(e.to_string()))?,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db::insert_draft(state.pool.as_ref(), &row).await?;
    Ok(draft_view(row, draft))
}

pub async fn get_draft(state: &AppState, draft_id: &str) -> Result<DraftView, WorkflowError> {
    let row = db::get_draft(state.pool.as_ref(), draft_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("draft", draft_id.to_string()))?;
    let draft = parse_draft(&row)?;
    Ok(draft_view(row, draft))
}

pub async fn update_draft_step(
    state: &AppState,
    draft_id: &str,
    title: Option<String>,
    step: Option<DraftStep>,
) -> Result<DraftView, WorkflowError> {
    let mut row = db::get_draft(state.pool.as_ref(), draft_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("draft", draft_id.to_string()))?;
    let mut draft = parse_draft(&row)?;

    if let Some(title) = title {
        row.title = title.clone();
        draft.title = title;
    }
    if let Some(step) = step {
        draft.apply_step(step);
    }

    let payload =
        serde_json::to_string(&draft).map_err(|e| WorkflowError::Corrupt(e.to_string()))?;
    db::update_draft(state.pool.as_ref(), draft_id, &row.title, &payload).await?;
    row.payload = payload;
    Ok(draft_view(row, draft))
}

/// Commits a complete draft into the submission aggregate: renders the three
/// generated forms, stores them, creates the submission in
/// pending_verification and deletes the draft. All or nothing - a renderer
/// failure commits nothing.
pub async fn submit_draft(state: &AppState, draft_id: &str) -> Result<Submission, WorkflowError> {
    let row = db::get_draft(state.pool.as_ref(), draft_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("draft", draft_id.to_string()))?;
    let draft = parse_draft(&row)?;

    if !draft.ready() {
        let missing: Vec<&str> = draft.missing_steps().iter().map(|k| k.as_str()).collect();
        return Err(WorkflowError::Validation(format!(
            "draft is incomplete: title and all steps are required (missing: {})",
            missing.join(", ")
        )));
    }

    let mut rendered: Vec<(DocumentKind, Vec<u8>)> = Vec::new();
    for kind in GENERATED_KINDS {
        let bytes = render_form(state, kind, draft.clone()).await?;
        rendered.push((kind, bytes));
    }

    let now = Utc::now();
    let submission = Submission {
        id: new_id(),
        tracking_code: tracking_code(),
        researcher_id: row.researcher_id.clone(),
        title: row.title.clone(),
        status: SubmissionStatus::PendingVerification.as_str().to_string(),
        category: None,
        classified_at: None,
        classified_by: None,
        verified_at: None,
        verified_by: None,
        reviewed_at: None,
        decided_at: None,
        decided_by: None,
        decision: None,
        decision_remarks: None,
        cycle: 1,
        created_at: now,
        submitted_at: Some(now),
    };

    let mut documents = Vec::new();
    for (kind, bytes) in &rendered {
        let path = blob_path(&submission.id, kind.as_str(), 1);
        state
            .blobs
            .put(&path, bytes)
            .map_err(|e| WorkflowError::Dependency(format!("blob store: {e}")))?;
        documents.push(DocumentRow {
            id: new_id(),
            submission_id: submission.id.clone(),
            kind: kind.as_str().to_string(),
            version: 1,
            blob_ref: path,
            size: bytes.len() as i64,
            uploaded_at: now,
            is_verified: None,
            comment: String::new(),
            prev_is_verified: None,
            prev_comment: None,
            has_prev: false,
        });
    }

    let mut tx = state.pool.begin().await?;
    db::insert_submission(&mut *tx, &submission).await?;
    for document in &documents {
        db::insert_document(&mut *tx, document).await?;
    }
    db::delete_draft(&mut *tx, draft_id).await?;
    tx.commit().await?;

    info!(
        "submission {} created from draft {} ({})",
        submission.tracking_code, draft_id, submission.title
    );
    Ok(submission)
}

async fn render_form(
    state: &AppState,
    kind: DocumentKind,
    draft: DraftSubmission,
) -> Result<Vec<u8>, WorkflowError> {
    let renderers = state.renderers.clone();
    tokio::task::spawn_blocking(move || {
        renderers
            .for_kind(kind)
            .ok_or_else(|| {
                WorkflowError::Validation(format!("no renderer for {}", kind.as_str()))
            })?
            .render(&draft)
            .map_err(|e| WorkflowError::Dependency(format!("form renderer: {e}")))
    })
    .await
    .map_err(|e| WorkflowError::Dependency(format!("render task: {e}")))?
}

// --- uploads ---

pub struct UploadOutcome {
    pub document: DocumentRow,
    /// True when the PDF parsed but yielded essentially no text (for
    /// instance a pure scan); surfaced to the caller, never fatal.
    pub text_warning: bool,
}

async fn inspect_pdf(bytes: Vec<u8>) -> Result<(Vec<u8>, bool), WorkflowError> {
    tokio::task::spawn_blocking(move || {
        lopdf::Document::load_mem(&bytes)
            .map_err(|e| WorkflowError::Validation(format!("file is not a readable PDF: {e}")))?;
        let text_warning = match pdf_extract::extract_text_from_mem(&bytes) {
            Ok(text) => text.trim().len() < 20,
            Err(_) => true,
        };
        Ok((bytes, text_warning))
    })
    .await
    .map_err(|e| WorkflowError::Dependency(format!("inspect task: {e}")))?
}

pub async fn upload_attachment(
    state: &AppState,
    submission_id: &str,
    kind: DocumentKind,
    bytes: Vec<u8>,
) -> Result<UploadOutcome, WorkflowError> {
    if !kind.is_attachment() {
        return Err(WorkflowError::Validation(format!(
            "{} is not an uploadable attachment kind",
            kind.as_str()
        )));
    }
    if bytes.is_empty() {
        return Err(WorkflowError::Validation("uploaded file is empty".into()));
    }
    let (bytes, text_warning) = inspect_pdf(bytes).await?;

    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::UploadDocument)?;

    let version = db::next_document_version(&mut *tx, submission_id, kind.as_str()).await?;
    let path = blob_path(submission_id, kind.as_str(), version);
    state
        .blobs
        .put(&path, &bytes)
        .map_err(|e| WorkflowError::Dependency(format!("blob store: {e}")))?;

    let document = DocumentRow {
        id: new_id(),
        submission_id: submission_id.to_string(),
        kind: kind.as_str().to_string(),
        version,
        blob_ref: path,
        size: bytes.len() as i64,
        uploaded_at: Utc::now(),
        is_verified: None,
        comment: String::new(),
        prev_is_verified: None,
        prev_comment: None,
        has_prev: false,
    };
    db::insert_document(&mut *tx, &document).await?;
    tx.commit().await?;

    if text_warning {
        warn!(
            "attachment {} on {} has no extractable text",
            kind.as_str(),
            submission_id
        );
    }
    Ok(UploadOutcome {
        document,
        text_warning,
    })
}

/// Re-renders one generated form before verification completes, then
/// refreshes the consolidated preview (best effort).
pub async fn update_form(
    state: &AppState,
    submission_id: &str,
    step: DraftStep,
) -> Result<DocumentRow, WorkflowError> {
    let kind = step.kind();
    let submission = db::get_submission(state.pool.as_ref(), submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::UpdateForm)?;

    let draft = DraftSubmission::for_step(&submission.title, step);
    let bytes = render_form(state, kind, draft).await?;

    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::UpdateForm)?;

    let version = db::next_document_version(&mut *tx, submission_id, kind.as_str()).await?;
    let path = blob_path(submission_id, kind.as_str(), version);
    state
        .blobs
        .put(&path, &bytes)
        .map_err(|e| WorkflowError::Dependency(format!("blob store: {e}")))?;

    let document = DocumentRow {
        id: new_id(),
        submission_id: submission_id.to_string(),
        kind: kind.as_str().to_string(),
        version,
        blob_ref: path,
        size: bytes.len() as i64,
        uploaded_at: Utc::now(),
        is_verified: None,
        comment: String::new(),
        prev_is_verified: None,
        prev_comment: None,
        has_prev: false,
    };
    db::insert_document(&mut *tx, &document).await?;
    tx.commit().await?;

    // Refresh the consolidated preview; a failure here never fails the edit.
    let docs = db::current_documents(state.pool.as_ref(), submission_id).await?;
    if let Err(e) = consolidate_submission(state, &submission, &docs).await {
        warn!("preview consolidation for {} failed: {}", submission_id, e);
    }

    Ok(document)
}

// --- verification ---

pub async fn verify_document(
    state: &AppState,
    submission_id: &str,
    document_id: &str,
    approved: bool,
    comment: &str,
) -> Result<DocumentRow, WorkflowError> {
    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::VerifyDocument)?;

    let document = db::get_document(&mut *tx, submission_id, document_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("document", document_id.to_string()))?;
    if !document.kind()?.requires_verification() {
        return Err(WorkflowError::Validation(
            "system-generated documents are not subject to verification".into(),
        ));
    }

    let mut fields = document.verification_fields();
    if crate::domain::documents::apply_verify(&mut fields, approved, comment) {
        db::update_verification(&mut *tx, &document.id, &fields).await?;
    }
    tx.commit().await?;

    Ok(DocumentRow {
        is_verified: fields.is_verified,
        comment: fields.comment,
        prev_is_verified: fields.prev_is_verified,
        prev_comment: fields.prev_comment,
        has_prev: fields.has_prev,
        ..document
    })
}

pub async fn undo_verification(
    state: &AppState,
    submission_id: &str,
    document_id: &str,
) -> Result<DocumentRow, WorkflowError> {
    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::UndoVerification)?;

    let document = db::get_document(&mut *tx, submission_id, document_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("document", document_id.to_string()))?;

    let mut fields = document.verification_fields();
    crate::domain::documents::apply_undo(&mut fields)?;
    db::update_verification(&mut *tx, &document.id, &fields).await?;
    tx.commit().await?;

    Ok(DocumentRow {
        is_verified: fields.is_verified,
        comment: fields.comment,
        prev_is_verified: fields.prev_is_verified,
        prev_comment: fields.prev_comment,
        has_prev: fields.has_prev,
        ..document
    })
}

#[derive(Debug, Serialize)]
pub struct VerificationOutcome {
    pub consolidated_url: Option<String>,
    pub page_count: usize,
    pub skipped: Vec<DocumentKind>,
}

/// Marks the submission verified once every required document is approved,
/// then runs the consolidation merge. Re-invoking on an already-verified
/// submission only re-runs the merge.
pub async fn complete_verification(
    state: &AppState,
    submission_id: &str,
    staff_id: &str,
) -> Result<VerificationOutcome, WorkflowError> {
    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    let current_status = submission.status()?;
    status::require(current_status, Action::CompleteVerification)?;

    let documents = db::current_documents(&mut *tx, submission_id).await?;
    let entries = documents
        .iter()
        .map(|d| Ok((d.kind()?, d.is_verified)))
        .collect::<Result<Vec<_>, WorkflowError>>()?;
    let set = VerificationSet::new(entries);
    if !set.all_approved() {
        return Err(GuardViolation::IncompleteVerification {
            pending: set.pending(),
            rejected: set.rejected(),
        }
        .into());
    }

    if current_status == SubmissionStatus::PendingVerification {
        db::set_verified(
            &mut *tx,
            submission_id,
            SubmissionStatus::Verified.as_str(),
            staff_id,
            Utc::now(),
        )
        .await?;
    }
    tx.commit().await?;

    consolidate_submission(state, &submission, &documents).await
}

/// Assembles the current artifacts in fixed order, merges them off the
/// request path, stores the output at a fresh blob path and moves the
/// consolidated-document pointer. Prior consolidated blobs are retained.
async fn consolidate_submission(
    state: &AppState,
    submission: &Submission,
    documents: &[DocumentRow],
) -> Result<VerificationOutcome, WorkflowError> {
    let mut parts = Vec::new();
    let mut fetch_skipped = Vec::new();
    for kind in GENERATED_KINDS.iter().chain(ATTACHMENT_KINDS.iter()) {
        let Some(doc) = documents.iter().find(|d| d.kind == kind.as_str()) else {
            continue;
        };
        match state.blobs.get(&doc.blob_ref) {
            Ok(bytes) => parts.push(ConsolidationPart { kind: *kind, bytes }),
            Err(e) => {
                warn!(
                    "consolidation: could not fetch {} for {}: {}",
                    kind.as_str(),
                    submission.id,
                    e
                );
                fetch_skipped.push(*kind);
            }
        }
    }

    let result = tokio::task::spawn_blocking(move || {
        pdf::consolidate(parts, |title| match pdf::render_separator(title) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("separator render failed: {}", e);
                None
            }
        })
    })
    .await
    .map_err(|e| WorkflowError::Dependency(format!("consolidation task: {e}")))?;

    let consolidated =
        result.map_err(|e| WorkflowError::Dependency(format!("consolidation: {e}")))?;

    let kind = DocumentKind::ConsolidatedApplication;
    let mut tx = state.pool.begin().await?;
    let version = db::next_document_version(&mut *tx, &submission.id, kind.as_str()).await?;
    let path = blob_path(&submission.id, kind.as_str(), version);
    state
        .blobs
        .put(&path, &consolidated.bytes)
        .map_err(|e| WorkflowError::Dependency(format!("blob store: {e}")))?;
    db::insert_document(
        &mut *tx,
        &DocumentRow {
            id: new_id(),
            submission_id: submission.id.clone(),
            kind: kind.as_str().to_string(),
            version,
            blob_ref: path.clone(),
            size: consolidated.bytes.len() as i64,
            uploaded_at: Utc::now(),
            is_verified: None,
            comment: String::new(),
            prev_is_verified: None,
            prev_comment: None,
            has_prev: false,
        },
    )
    .await?;
    tx.commit().await?;

    let mut skipped = fetch_skipped;
    skipped.extend(consolidated.skipped);

    info!(
        "consolidated {} ({} pages, {} part(s) skipped)",
        submission.tracking_code,
        consolidated.page_count,
        skipped.len()
    );

    Ok(VerificationOutcome {
        consolidated_url: state.blobs.signed_url(&path, SIGNED_URL_TTL_SECS).ok(),
        page_count: consolidated.page_count,
        skipped,
    })
}

// --- classification ---

#[derive(Debug, Serialize)]
pub struct ClassifyOutcome {
    pub status: SubmissionStatus,
    pub category: ReviewCategory,
    pub suggested_due_date: NaiveDate,
}

pub async fn classify(
    state: &AppState,
    submission_id: &str,
    staff_id: &str,
    category: ReviewCategory,
) -> Result<ClassifyOutcome, WorkflowError> {
    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::Classify)?;

    // Exempted submissions terminate here; everyone else queues for
    // assignment.
    let new_status = if category == ReviewCategory::Exempted {
        SubmissionStatus::Done
    } else {
        SubmissionStatus::AwaitingAssignment
    };
    db::set_classified(
        &mut *tx,
        submission_id,
        new_status.as_str(),
        category.as_str(),
        staff_id,
        Utc::now(),
    )
    .await?;
    tx.commit().await?;

    if category == ReviewCategory::Exempted {
        spawn_certificate(state, &submission, CertificateKind::Exemption);
    }

    Ok(ClassifyOutcome {
        status: new_status,
        category,
        suggested_due_date: category.suggested_due_date(),
    })
}

// --- decision ---

pub async fn decide(
    state: &AppState,
    submission_id: &str,
    chair_id: &str,
    decision: Decision,
    remarks: &str,
) -> Result<Submission, WorkflowError> {
    let mut tx = state.pool.begin().await?;
    let submission = db::get_submission_for_update(&mut tx, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    status::require(submission.status()?, Action::Decide)?;

    db::set_decided(
        &mut *tx,
        submission_id,
        SubmissionStatus::Decided.as_str(),
        decision.as_str(),
        chair_id,
        remarks,
        Utc::now(),
    )
    .await?;
    tx.commit().await?;

    if decision == Decision::Approved {
        spawn_certificate(state, &submission, CertificateKind::Approval);
    }

    db::get_submission(state.pool.as_ref(), submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))
}

/// Certificates are issued in the background and are best effort; a failure
/// is logged, never surfaced to the decision flow.
fn spawn_certificate(state: &AppState, submission: &Submission, kind: CertificateKind) {
    let pool = state.pool.clone();
    let blobs = state.blobs.clone();
    let submission = submission.clone();
    tokio::spawn(async move {
        if let Err(e) = issue_certificate(pool, blobs, submission, kind).await {
            tracing::error!("certificate generation failed: {}", e);
        }
    });
}

async fn issue_certificate(
    pool: crate::db::DbPool,
    blobs: std::sync::Arc<crate::storage::FsBlobStore>,
    submission: Submission,
    kind: CertificateKind,
) -> Result<(), WorkflowError> {
    let title = submission.title.clone();
    let code = submission.tracking_code.clone();
    let bytes = tokio::task::spawn_blocking(move || pdf::generate_certificate(kind, &title, &code))
        .await
        .map_err(|e| WorkflowError::Dependency(format!("certificate task: {e}")))?
        .map_err(|e| WorkflowError::Dependency(format!("certificate: {e}")))?;

    let doc_kind = DocumentKind::Certificate;
    let version =
        db::next_document_version(pool.as_ref(), &submission.id, doc_kind.as_str()).await?;
    let path = blob_path(&submission.id, doc_kind.as_str(), version);
    blobs
        .put(&path, &bytes)
        .map_err(|e| WorkflowError::Dependency(format!("blob store: {e}")))?;
    db::insert_document(
        pool.as_ref(),
        &DocumentRow {
            id: new_id(),
            submission_id: submission.id.clone(),
            kind: doc_kind.as_str().to_string(),
            version,
            blob_ref: path,
            size: bytes.len() as i64,
            uploaded_at: Utc::now(),
            is_verified: None,
            comment: String::new(),
            prev_is_verified: None,
            prev_comment: None,
            has_prev: false,
        },
    )
    .await?;
    info!("certificate issued for {}", submission.tracking_code);
    Ok(())
}

// --- reads ---

#[derive(Debug, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: DocumentRow,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompletionView {
    pub completed: usize,
    pub required: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: Submission,
    pub stage: &'static str,
    pub completion: CompletionView,
    pub documents: Vec<DocumentView>,
    pub history: Vec<HistoryEvent>,
}

pub async fn submission_detail(
    state: &AppState,
    submission_id: &str,
) -> Result<SubmissionDetail, WorkflowError> {
    let pool = state.pool.as_ref();
    let submission = db::get_submission(pool, submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;
    let stage = submission.status()?.describe();

    let documents = db::current_documents(pool, submission_id).await?;
    let assignments = db::all_assignments(pool, submission_id).await?;
    let revisions = db::list_revision_requests(pool, submission_id).await?;
    let (completed, required) =
        reviews::completion_ratio(pool, submission_id, submission.cycle).await?;

    let documents = documents
        .into_iter()
        .map(|document| DocumentView {
            url: state
                .blobs
                .signed_url(&document.blob_ref, SIGNED_URL_TTL_SECS)
                .ok(),
            document,
        })
        .collect();

    let history = history::project(&submission, &assignments, &revisions);

    Ok(SubmissionDetail {
        stage,
        completion: CompletionView {
            completed,
            required,
        },
        documents,
        history,
        submission,
    })
}

#[derive(Debug, Serialize)]
pub struct ConsolidatedView {
    pub url: Option<String>,
    pub page_count: Option<usize>,
    pub version: Option<i32>,
}

/// The consolidated document may briefly lag the submission (the merge runs
/// after the verification pass); absence is reported, never an error.
pub async fn consolidated_view(
    state: &AppState,
    submission_id: &str,
) -> Result<ConsolidatedView, WorkflowError> {
    let submission = db::get_submission(state.pool.as_ref(), submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.to_string()))?;

    let Some(document) = db::current_document_of_kind(
        state.pool.as_ref(),
        &submission.id,
        DocumentKind::ConsolidatedApplication.as_str(),
    )
    .await?
    else {
        return Ok(ConsolidatedView {
            url: None,
            page_count: None,
            version: None,
        });
    };

    let page_count = match state.blobs.get(&document.blob_ref) {
        Ok(bytes) => tokio::task::spawn_blocking(move || {
            lopdf::Document::load_mem(&bytes)
                .map(|d| d.get_pages().len())
                .ok()
        })
        .await
        .unwrap_or(None),
        Err(_) => None,
    };

    Ok(ConsolidatedView {
        url: state
            .blobs
            .signed_url(&document.blob_ref, SIGNED_URL_TTL_SECS)
            .ok(),
        page_count,
        version: Some(document.version),
    })
}
