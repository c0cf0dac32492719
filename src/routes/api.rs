use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use crate::db;
use crate::domain::classify::ReviewCategory;
use crate::domain::documents::DocumentKind;
use crate::domain::draft::DraftStep;
use crate::domain::status::SubmissionStatus;
use crate::error::WorkflowError;
use crate::state::AppState;
use crate::workflow::{self, assignment, reviews, revision, Decision};

// --- drafts ---

#[derive(Deserialize)]
pub struct CreateDraftRequest {
    pub researcher_id: String,
    #[serde(default)]
    pub title: String,
}

pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDraftRequest>,
) -> Result<Json<workflow::DraftView>, WorkflowError> {
    let view = workflow::create_draft(&state, req.researcher_id, req.title).await?;
    Ok(Json(view))
}

pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
) -> Result<Json<workflow::DraftView>, WorkflowError> {
    Ok(Json(workflow::get_draft(&state, &draft_id).await?))
}

#[derive(Deserialize)]
pub struct UpdateDraftRequest {
    pub title: Option<String>,
    pub step: Option<DraftStep>,
}

pub async fn update_draft_step(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
    Json(req): Json<UpdateDraftRequest>,
) -> Result<Json<workflow::DraftView>, WorkflowError> {
    let view = workflow::update_draft_step(&state, &draft_id, req.title, req.step).await?;
    Ok(Json(view))
}

pub async fn submit_draft(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
) -> Result<Json<db::Submission>, WorkflowError> {
    Ok(Json(workflow::submit_draft(&state, &draft_id).await?))
}

// --- submissions ---

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<db::Submission>>, WorkflowError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(SubmissionStatus::parse(s).ok_or_else(|| {
            WorkflowError::Validation(format!("unknown status filter '{s}'"))
        })?),
        None => None,
    };
    let submissions =
        db::list_submissions(state.pool.as_ref(), status.map(|s| s.as_str())).await?;
    Ok(Json(submissions))
}

pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<workflow::SubmissionDetail>, WorkflowError> {
    Ok(Json(workflow::submission_detail(&state, &submission_id).await?))
}

pub async fn get_consolidated(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<workflow::ConsolidatedView>, WorkflowError> {
    Ok(Json(workflow::consolidated_view(&state, &submission_id).await?))
}

// --- documents ---

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, WorkflowError> {
    let mut kind: Option<DocumentKind> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut filename = String::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        if name == "kind" {
            if let Ok(text) = field.text().await {
                kind = DocumentKind::parse(text.trim());
            }
        } else if name == "file" {
            filename = field.file_name().unwrap_or("document.pdf").to_string();
            if let Ok(bytes) = field.bytes().await {
                data = Some(bytes.to_vec());
            }
        }
    }

    let kind = kind.ok_or_else(|| {
        WorkflowError::Validation("field 'kind' must name a valid document kind".into())
    })?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(WorkflowError::Validation(
            "only PDF uploads are accepted".into(),
        ));
    }
    let data = data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| WorkflowError::Validation("field 'file' is required".into()))?;

    let outcome = workflow::upload_attachment(&state, &submission_id, kind, data).await?;
    Ok(Json(serde_json::json!({
        "document": outcome.document,
        "text_warning": outcome.text_warning,
    })))
}

pub async fn update_form(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(step): Json<DraftStep>,
) -> Result<Json<db::DocumentRow>, WorkflowError> {
    Ok(Json(workflow::update_form(&state, &submission_id, step).await?))
}

// --- verification ---

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub staff_id: String,
    pub approved: bool,
    #[serde(default)]
    pub comment: String,
}

pub async fn verify_document(
    State(state): State<Arc<AppState>>,
    Path((submission_id, document_id)): Path<(String, String)>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<db::DocumentRow>, WorkflowError> {
    tracing::info!(
        "{} verifying document {} on {}: approved={}",
        req.staff_id,
        document_id,
        submission_id,
        req.approved
    );
    let document = workflow::verify_document(
        &state,
        &submission_id,
        &document_id,
        req.approved,
        &req.comment,
    )
    .await?;
    Ok(Json(document))
}

pub async fn undo_verification(
    State(state): State<Arc<AppState>>,
    Path((submission_id, document_id)): Path<(String, String)>,
) -> Result<Json<db::DocumentRow>, WorkflowError> {
    let document = workflow::undo_verification(&state, &submission_id, &document_id).await?;
    Ok(Json(document))
}

#[derive(Deserialize)]
pub struct CompleteVerificationRequest {
    pub staff_id: String,
}

pub async fn complete_verification(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(req): Json<CompleteVerificationRequest>,
) -> Result<Json<workflow::VerificationOutcome>, WorkflowError> {
    let outcome =
        workflow::complete_verification(&state, &submission_id, &req.staff_id).await?;
    Ok(Json(outcome))
}

// --- classification / decision ---

#[derive(Deserialize)]
pub struct ClassifyRequest {
    pub staff_id: String,
    pub category: ReviewCategory,
}

pub async fn classify(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<workflow::ClassifyOutcome>, WorkflowError> {
    let outcome = workflow::classify(&state, &submission_id, &req.staff_id, req.category).await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct DecideRequest {
    pub chair_id: String,
    pub decision: Decision,
    #[serde(default)]
    pub remarks: String,
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(req): Json<DecideRequest>,
) -> Result<Json<db::Submission>, WorkflowError> {
    let submission = workflow::decide(
        &state,
        &submission_id,
        &req.chair_id,
        req.decision,
        &req.remarks,
    )
    .await?;
    Ok(Json(submission))
}

// --- reviewers / assignments / reviews ---

pub async fn list_reviewers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<db::Reviewer>>, WorkflowError> {
    Ok(Json(db::list_active_reviewers(state.pool.as_ref()).await?))
}

#[derive(Deserialize)]
pub struct CreateReviewerRequest {
    pub name: String,
    pub email: String,
}

pub async fn create_reviewer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReviewerRequest>,
) -> Result<Json<db::Reviewer>, WorkflowError> {
    if req.name.trim().is_empty() || !req.email.contains('@') {
        return Err(WorkflowError::Validation(
            "reviewer needs a name and a valid email".into(),
        ));
    }
    let reviewer = db::Reviewer {
        id: crate::storage::new_id(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        active: true,
        created_at: chrono::Utc::now(),
    };
    db::insert_reviewer(state.pool.as_ref(), &reviewer).await?;
    Ok(Json(reviewer))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub secretariat_id: String,
    pub reviewer_ids: Vec<String>,
    pub due_date: NaiveDate,
}

pub async fn assign_reviewers(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<assignment::AssignmentOutcome>, WorkflowError> {
    let outcome = assignment::assign_reviewers(
        &state,
        &submission_id,
        &req.secretariat_id,
        req.reviewer_ids,
        req.due_date,
    )
    .await?;
    Ok(Json(outcome))
}

pub async fn past_reviewers(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<serde_json::Value>, WorkflowError> {
    let reviewer_ids = assignment::past_reviewers(&state, &submission_id).await?;
    Ok(Json(serde_json::json!({ "reviewer_ids": reviewer_ids })))
}

#[derive(Deserialize)]
pub struct SubmitReviewRequest {
    pub reviewer_id: String,
    pub recommendation: reviews::Recommendation,
    #[serde(default)]
    pub remarks: String,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<String>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<Json<reviews::ReviewOutcome>, WorkflowError> {
    let outcome = reviews::submit_review(
        &state,
        &assignment_id,
        &req.reviewer_id,
        req.recommendation,
        &req.remarks,
    )
    .await?;
    Ok(Json(outcome))
}

// --- revision cycle ---

#[derive(Deserialize)]
pub struct RevisionRequestBody {
    pub staff_id: String,
    pub checklist: Vec<DocumentKind>,
    pub comment: String,
}

pub async fn request_revision(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Json(req): Json<RevisionRequestBody>,
) -> Result<Json<db::Submission>, WorkflowError> {
    let submission = revision::request_revision(
        &state,
        &submission_id,
        &req.staff_id,
        req.checklist,
        &req.comment,
    )
    .await?;
    Ok(Json(submission))
}

pub async fn resubmit(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<revision::ResubmitOutcome>, WorkflowError> {
    let mut replacements: Vec<(DocumentKind, Vec<u8>)> = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        let kind = DocumentKind::parse(&name).ok_or_else(|| {
            WorkflowError::Validation(format!("unknown document kind field '{name}'"))
        })?;
        if let Ok(bytes) = field.bytes().await {
            replacements.push((kind, bytes.to_vec()));
        }
    }

    let outcome = revision::resubmit(&state, &submission_id, replacements).await?;
    Ok(Json(outcome))
}
