mod models;

pub use models::*;

use crate::domain::documents::VerificationFields;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::sync::Arc;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// --- submissions ---

pub async fn insert_submission(
    exec: impl PgExecutor<'_>,
    s: &Submission,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO submissions (id, tracking_code, researcher_id, title, status, cycle, created_at, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&s.id)
    .bind(&s.tracking_code)
    .bind(&s.researcher_id)
    .bind(&s.title)
    .bind(&s.status)
    .bind(s.cycle)
    .bind(s.created_at)
    .bind(s.submitted_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn get_submission(
    exec: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Per-submission single-writer lock; every mutating workflow operation
/// fetches through this inside its transaction.
pub async fn get_submission_for_update(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn list_submissions(
    exec: impl PgExecutor<'_>,
    status: Option<&str>,
) -> Result<Vec<Submission>, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_as::<_, Submission>(
                "SELECT * FROM submissions WHERE status = $1 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(exec)
            .await
        }
        None => {
            sqlx::query_as::<_, Submission>("SELECT * FROM submissions ORDER BY created_at DESC")
                .fetch_all(exec)
                .await
        }
    }
}

pub async fn update_status(
    exec: impl PgExecutor<'_>,
    id: &str,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE submissions SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_verified(
    exec: impl PgExecutor<'_>,
    id: &str,
    status: &str,
    verified_by: &str,
    verified_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions SET status = $2, verified_by = $3, verified_at = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(verified_by)
    .bind(verified_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn set_classified(
    exec: impl PgExecutor<'_>,
    id: &str,
    status: &str,
    category: &str,
    classified_by: &str,
    classified_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET status = $2, category = $3, classified_by = $4, classified_at = $5
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(category)
    .bind(classified_by)
    .bind(classified_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn set_reviewed(
    exec: impl PgExecutor<'_>,
    id: &str,
    status: &str,
    reviewed_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE submissions SET status = $2, reviewed_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status)
        .bind(reviewed_at)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_decided(
    exec: impl PgExecutor<'_>,
    id: &str,
    status: &str,
    decision: &str,
    decided_by: &str,
    remarks: &str,
    decided_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET status = $2, decision = $3, decided_by = $4, decision_remarks = $5, decided_at = $6
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(decision)
    .bind(decided_by)
    .bind(remarks)
    .bind(decided_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_resubmitted(
    exec: impl PgExecutor<'_>,
    id: &str,
    status: &str,
    cycle: i32,
    submitted_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE submissions SET status = $2, cycle = $3, submitted_at = $4 WHERE id = $1")
        .bind(id)
        .bind(status)
        .bind(cycle)
        .bind(submitted_at)
        .execute(exec)
        .await?;
    Ok(())
}

// --- documents ---

pub async fn insert_document(
    exec: impl PgExecutor<'_>,
    d: &DocumentRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, submission_id, kind, version, blob_ref, size, uploaded_at,
                               is_verified, comment, prev_is_verified, prev_comment, has_prev)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(&d.id)
    .bind(&d.submission_id)
    .bind(&d.kind)
    .bind(d.version)
    .bind(&d.blob_ref)
    .bind(d.size)
    .bind(d.uploaded_at)
    .bind(d.is_verified)
    .bind(&d.comment)
    .bind(d.prev_is_verified)
    .bind(&d.prev_comment)
    .bind(d.has_prev)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn get_document(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    document_id: &str,
) -> Result<Option<DocumentRow>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM documents WHERE id = $1 AND submission_id = $2",
    )
    .bind(document_id)
    .bind(submission_id)
    .fetch_optional(exec)
    .await
}

/// The current (highest-version) document of each kind.
pub async fn current_documents(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<DocumentRow>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT DISTINCT ON (kind) *
        FROM documents
        WHERE submission_id = $1
        ORDER BY kind, version DESC
        "#,
    )
    .bind(submission_id)
    .fetch_all(exec)
    .await
}

pub async fn current_document_of_kind(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    kind: &str,
) -> Result<Option<DocumentRow>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT * FROM documents
        WHERE submission_id = $1 AND kind = $2
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(submission_id)
    .bind(kind)
    .fetch_optional(exec)
    .await
}

pub async fn next_document_version(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    kind: &str,
) -> Result<i32, sqlx::Error> {
    let max: Option<i32> = sqlx::query_scalar(
        "SELECT MAX(version) FROM documents WHERE submission_id = $1 AND kind = $2",
    )
    .bind(submission_id)
    .bind(kind)
    .fetch_one(exec)
    .await?;
    Ok(max.unwrap_or(0) + 1)
}

pub async fn update_verification(
    exec: impl PgExecutor<'_>,
    document_id: &str,
    fields: &VerificationFields,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE documents
        SET is_verified = $2, comment = $3, prev_is_verified = $4, prev_comment = $5, has_prev = $6
        WHERE id = $1
        "#,
    )
    .bind(document_id)
    .bind(fields.is_verified)
    .bind(&fields.comment)
    .bind(fields.prev_is_verified)
    .bind(&fields.prev_comment)
    .bind(fields.has_prev)
    .execute(exec)
    .await?;
    Ok(())
}

// --- reviewers ---

pub async fn insert_reviewer(exec: impl PgExecutor<'_>, r: &Reviewer) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reviewers (id, name, email, active, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&r.id)
    .bind(&r.name)
    .bind(&r.email)
    .bind(r.active)
    .bind(r.created_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn list_active_reviewers(
    exec: impl PgExecutor<'_>,
) -> Result<Vec<Reviewer>, sqlx::Error> {
    sqlx::query_as::<_, Reviewer>("SELECT * FROM reviewers WHERE active ORDER BY name")
        .fetch_all(exec)
        .await
}

pub async fn find_reviewers(
    exec: impl PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<Reviewer>, sqlx::Error> {
    sqlx::query_as::<_, Reviewer>("SELECT * FROM reviewers WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(exec)
        .await
}

// --- reviewer assignments ---

pub async fn get_assignment(
    exec: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<ReviewerAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ReviewerAssignment>("SELECT * FROM reviewer_assignments WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn assignments_for_cycle(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    cycle: i32,
) -> Result<Vec<ReviewerAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ReviewerAssignment>(
        "SELECT * FROM reviewer_assignments WHERE submission_id = $1 AND cycle = $2 ORDER BY assigned_at",
    )
    .bind(submission_id)
    .bind(cycle)
    .fetch_all(exec)
    .await
}

pub async fn all_assignments(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<ReviewerAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ReviewerAssignment>(
        "SELECT * FROM reviewer_assignments WHERE submission_id = $1 ORDER BY assigned_at",
    )
    .bind(submission_id)
    .fetch_all(exec)
    .await
}

pub async fn insert_assignment(
    exec: impl PgExecutor<'_>,
    a: &ReviewerAssignment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO reviewer_assignments (id, submission_id, reviewer_id, cycle, status, assigned_at, due_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&a.id)
    .bind(&a.submission_id)
    .bind(&a.reviewer_id)
    .bind(a.cycle)
    .bind(&a.status)
    .bind(a.assigned_at)
    .bind(a.due_date)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update_assignment_due_date(
    exec: impl PgExecutor<'_>,
    id: &str,
    due_date: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE reviewer_assignments SET due_date = $2, assigned_at = now() WHERE id = $1")
        .bind(id)
        .bind(due_date)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn delete_assignments_not_in(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    cycle: i32,
    keep_reviewer_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM reviewer_assignments
        WHERE submission_id = $1 AND cycle = $2 AND NOT (reviewer_id = ANY($3))
        "#,
    )
    .bind(submission_id)
    .bind(cycle)
    .bind(keep_reviewer_ids)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

pub async fn mark_assignment_completed(
    exec: impl PgExecutor<'_>,
    id: &str,
    completed_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE reviewer_assignments SET status = 'completed', completed_at = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(completed_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Reviewers who held an assignment on any earlier cycle of this submission.
/// A continuity hint for the secretariat, never an enforced constraint.
pub async fn past_reviewer_ids(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    before_cycle: i32,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT reviewer_id FROM reviewer_assignments
        WHERE submission_id = $1 AND cycle < $2
        ORDER BY reviewer_id
        "#,
    )
    .bind(submission_id)
    .bind(before_cycle)
    .fetch_all(exec)
    .await
}

// --- reviews ---

pub async fn get_review_by_assignment(
    exec: impl PgExecutor<'_>,
    assignment_id: &str,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE assignment_id = $1")
        .bind(assignment_id)
        .fetch_optional(exec)
        .await
}

pub async fn insert_review(exec: impl PgExecutor<'_>, r: &Review) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO reviews (id, assignment_id, submission_id, recommendation, remarks, status, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&r.id)
    .bind(&r.assignment_id)
    .bind(&r.submission_id)
    .bind(&r.recommendation)
    .bind(&r.remarks)
    .bind(&r.status)
    .bind(r.submitted_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn reviews_for_cycle(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
    cycle: i32,
) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        r#"
        SELECT r.* FROM reviews r
        JOIN reviewer_assignments a ON a.id = r.assignment_id
        WHERE a.submission_id = $1 AND a.cycle = $2
        ORDER BY r.submitted_at
        "#,
    )
    .bind(submission_id)
    .bind(cycle)
    .fetch_all(exec)
    .await
}

// --- revision requests ---

pub async fn insert_revision_request(
    exec: impl PgExecutor<'_>,
    r: &RevisionRequest,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO revision_requests (id, submission_id, cycle, checklist, comment, requested_at, requested_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&r.id)
    .bind(&r.submission_id)
    .bind(r.cycle)
    .bind(&r.checklist)
    .bind(&r.comment)
    .bind(r.requested_at)
    .bind(&r.requested_by)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn latest_revision_request(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<Option<RevisionRequest>, sqlx::Error> {
    sqlx::query_as::<_, RevisionRequest>(
        r#"
        SELECT * FROM revision_requests
        WHERE submission_id = $1
        ORDER BY requested_at DESC
        LIMIT 1
        "#,
    )
    .bind(submission_id)
    .fetch_optional(exec)
    .await
}

pub async fn list_revision_requests(
    exec: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<RevisionRequest>, sqlx::Error> {
    sqlx::query_as::<_, RevisionRequest>(
        "SELECT * FROM revision_requests WHERE submission_id = $1 ORDER BY requested_at",
    )
    .bind(submission_id)
    .fetch_all(exec)
    .await
}

// --- drafts ---

pub async fn insert_draft(exec: impl PgExecutor<'_>, d: &DraftRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO drafts (id, researcher_id, title, payload, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&d.id)
    .bind(&d.researcher_id)
    .bind(&d.title)
    .bind(&d.payload)
    .bind(d.created_at)
    .bind(d.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn get_draft(
    exec: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<DraftRow>, sqlx::Error> {
    sqlx::query_as::<_, DraftRow>("SELECT * FROM drafts WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn update_draft(
    exec: impl PgExecutor<'_>,
    id: &str,
    title: &str,
    payload: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE drafts SET title = $2, payload = $3, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(title)
        .bind(payload)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn delete_draft(exec: impl PgExecutor<'_>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM drafts WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}
