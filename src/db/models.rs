use crate::domain::classify::ReviewCategory;
use crate::domain::documents::{DocumentKind, VerificationFields};
use crate::domain::status::SubmissionStatus;
use crate::error::WorkflowError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub tracking_code: String,
    pub researcher_id: String,
    pub title: String,
    pub status: String,
    pub category: Option<String>,
    pub classified_at: Option<DateTime<Utc>>,
    pub classified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub decision: Option<String>,
    pub decision_remarks: Option<String>,
    pub cycle: i32,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn status(&self) -> Result<SubmissionStatus, WorkflowError> {
        SubmissionStatus::parse(&self.status)
            .ok_or_else(|| WorkflowError::Corrupt(format!("unknown status '{}'", self.status)))
    }

    pub fn category(&self) -> Result<Option<ReviewCategory>, WorkflowError> {
        match &self.category {
            None => Ok(None),
            Some(c) => ReviewCategory::parse(c)
                .map(Some)
                .ok_or_else(|| WorkflowError::Corrupt(format!("unknown category '{c}'"))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: String,
    pub submission_id: String,
    pub kind: String,
    pub version: i32,
    pub blob_ref: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub is_verified: Option<bool>,
    pub comment: String,
    pub prev_is_verified: Option<bool>,
    pub prev_comment: Option<String>,
    pub has_prev: bool,
}

impl DocumentRow {
    pub fn kind(&self) -> Result<DocumentKind, WorkflowError> {
        DocumentKind::parse(&self.kind)
            .ok_or_else(|| WorkflowError::Corrupt(format!("unknown document kind '{}'", self.kind)))
    }

    pub fn verification_fields(&self) -> VerificationFields {
        VerificationFields {
            is_verified: self.is_verified,
            comment: self.comment.clone(),
            prev_is_verified: self.prev_is_verified,
            prev_comment: self.prev_comment.clone(),
            has_prev: self.has_prev,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewerAssignment {
    pub id: String,
    pub submission_id: String,
    pub reviewer_id: String,
    pub cycle: i32,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub assignment_id: String,
    pub submission_id: String,
    pub recommendation: String,
    pub remarks: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RevisionRequest {
    pub id: String,
    pub submission_id: String,
    pub cycle: i32,
    pub checklist: String,
    pub comment: String,
    pub requested_at: DateTime<Utc>,
    pub requested_by: String,
}

impl RevisionRequest {
    pub fn kinds(&self) -> Result<Vec<DocumentKind>, WorkflowError> {
        let names: Vec<String> = serde_json::from_str(&self.checklist)
            .map_err(|e| WorkflowError::Corrupt(format!("bad checklist: {e}")))?;
        names
            .iter()
            .map(|n| {
                DocumentKind::parse(n)
                    .ok_or_else(|| WorkflowError::Corrupt(format!("unknown checklist kind '{n}'")))
            })
            .collect()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DraftRow {
    pub id: String,
    pub researcher_id: String,
    pub title: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
