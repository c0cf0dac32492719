use crate::db::{ReviewerAssignment, RevisionRequest, Submission};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry of the submission timeline. Always recomputed from the
/// aggregates at read time; nothing here is ever stored.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEvent {
    pub at: DateTime<Utc>,
    pub label: String,
    pub actor: Option<String>,
}

pub fn project(
    submission: &Submission,
    assignments: &[ReviewerAssignment],
    revisions: &[RevisionRequest],
) -> Vec<HistoryEvent> {
    let mut events = Vec::new();

    events.push(HistoryEvent {
        at: submission.submitted_at.unwrap_or(submission.created_at),
        label: "Submission received".to_string(),
        actor: Some(submission.researcher_id.clone()),
    });

    if let Some(at) = submission.verified_at {
        events.push(HistoryEvent {
            at,
            label: "Document verification complete".to_string(),
            actor: submission.verified_by.clone(),
        });
    }

    if let Some(at) = submission.classified_at {
        let label = match &submission.category {
            Some(c) => format!("Classified as {c}"),
            None => "Classified".to_string(),
        };
        events.push(HistoryEvent {
            at,
            label,
            actor: submission.classified_by.clone(),
        });
    }

    // One event per review pass, stamped with that cycle's latest assignment.
    let mut cycles: Vec<i32> = assignments.iter().map(|a| a.cycle).collect();
    cycles.sort_unstable();
    cycles.dedup();
    for cycle in cycles {
        let in_cycle: Vec<&ReviewerAssignment> =
            assignments.iter().filter(|a| a.cycle == cycle).collect();
        if let Some(latest) = in_cycle.iter().map(|a| a.assigned_at).max() {
            events.push(HistoryEvent {
                at: latest,
                label: format!("{} reviewer(s) assigned, submission under review", in_cycle.len()),
                actor: None,
            });
        }
    }

    if let Some(at) = submission.reviewed_at {
        events.push(HistoryEvent {
            at,
            label: "All reviews submitted".to_string(),
            actor: None,
        });
    }

    for revision in revisions {
        events.push(HistoryEvent {
            at: revision.requested_at,
            label: "Returned to researcher for revision".to_string(),
            actor: Some(revision.requested_by.clone()),
        });
    }

    if let Some(at) = submission.decided_at {
        let label = match &submission.decision {
            Some(d) => format!("Decision issued: {d}"),
            None => "Decision issued".to_string(),
        };
        events.push(HistoryEvent {
            at,
            label,
            actor: submission.decided_by.clone(),
        });
    }

    events.sort_by_key(|e| e.at);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn base_submission(t0: DateTime<Utc>) -> Submission {
        Submission {
            id: "s1".into(),
            tracking_code: "REC-20260805-abcd1234".into(),
            researcher_id: "r1".into(),
            title: "Study".into(),
            status: "under_review".into(),
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
            created_at: t0,
            submitted_at: Some(t0),
        }
    }

    fn assignment(cycle: i32, at: DateTime<Utc>) -> ReviewerAssignment {
        ReviewerAssignment {
            id: format!("a-{cycle}-{at}"),
            submission_id: "s1".into(),
            reviewer_id: "rev1".into(),
            cycle,
            status: "assigned".into(),
            assigned_at: at,
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            completed_at: None,
        }
    }

    #[test]
    fn events_come_out_in_time_order() {
        let t0 = Utc::now() - Duration::days(10);
        let mut sub = base_submission(t0);
        sub.verified_at = Some(t0 + Duration::days(1));
        sub.verified_by = Some("staff1".into());
        sub.classified_at = Some(t0 + Duration::days(2));
        sub.category = Some("expedited".into());
        sub.reviewed_at = Some(t0 + Duration::days(6));

        let assignments = vec![
            assignment(1, t0 + Duration::days(3)),
            assignment(1, t0 + Duration::days(3) + Duration::hours(1)),
        ];

        let events = project(&sub, &assignments, &[]);
        let labels: Vec<&str> = events.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Submission received",
                "Document verification complete",
                "Classified as expedited",
                "2 reviewer(s) assigned, submission under review",
                "All reviews submitted",
            ]
        );
        assert!(events.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn revision_cycles_appear_per_request() {
        let t0 = Utc::now() - Duration::days(20);
        let sub = base_submission(t0);
        let revisions = vec![RevisionRequest {
            id: "rr1".into(),
            submission_id: "s1".into(),
            cycle: 1,
            checklist: "[\"consent_form\"]".into(),
            comment: "fix section 3".into(),
            requested_at: t0 + Duration::days(7),
            requested_by: "staff2".into(),
        }];

        let events = project(&sub, &[], &revisions);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].label, "Returned to researcher for revision");
        assert_eq!(events[1].actor.as_deref(), Some("staff2"));
    }

    #[test]
    fn assignment_passes_are_grouped_by_cycle() {
        let t0 = Utc::now() - Duration::days(30);
        let sub = base_submission(t0);
        let assignments = vec![
            assignment(1, t0 + Duration::days(2)),
            assignment(2, t0 + Duration::days(12)),
        ];
        let events = project(&sub, &assignments, &[]);
        let passes = events
            .iter()
            .filter(|e| e.label.contains("under review"))
            .count();
        assert_eq!(passes, 2);
    }
}
