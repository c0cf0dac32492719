use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Review categories a secretariat can assign. A submission with no stored
/// category is unclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCategory {
    Exempted,
    Expedited,
    FullReview,
}

/// Exempted submissions skip review entirely, so no due-date offset applies.
pub const EXEMPTED_DUE_OFFSET_DAYS: i64 = 0;
/// Expedited review uses a fixed panel of exactly three reviewers.
pub const EXPEDITED_QUORUM: usize = 3;
pub const EXPEDITED_DUE_OFFSET_DAYS: i64 = 14;
pub const FULL_REVIEW_DUE_OFFSET_DAYS: i64 = 30;

/// How many reviewers a category demands at assignment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumRule {
    /// No reviewers are ever assigned.
    None,
    /// Exactly this many reviewers.
    Fixed(usize),
    /// Anywhere from one reviewer up to the active pool size; the required
    /// review count is the number of assignments actually created.
    UpToPool,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub quorum: QuorumRule,
    pub due_offset_days: i64,
}

impl ReviewCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewCategory::Exempted => "exempted",
            ReviewCategory::Expedited => "expedited",
            ReviewCategory::FullReview => "full_review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "exempted" => ReviewCategory::Exempted,
            "expedited" => ReviewCategory::Expedited,
            "full_review" => ReviewCategory::FullReview,
            _ => return None,
        })
    }

    pub fn rule(&self) -> ClassificationRule {
        match self {
            ReviewCategory::Exempted => ClassificationRule {
                quorum: QuorumRule::None,
                due_offset_days: EXEMPTED_DUE_OFFSET_DAYS,
            },
            ReviewCategory::Expedited => ClassificationRule {
                quorum: QuorumRule::Fixed(EXPEDITED_QUORUM),
                due_offset_days: EXPEDITED_DUE_OFFSET_DAYS,
            },
            ReviewCategory::FullReview => ClassificationRule {
                quorum: QuorumRule::UpToPool,
                due_offset_days: FULL_REVIEW_DUE_OFFSET_DAYS,
            },
        }
    }

    pub fn suggested_due_date(&self) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(self.rule().due_offset_days)
    }

    /// Bounds on an acceptable reviewer-id list, given the active pool size.
    pub fn quorum_bounds(&self, pool_size: usize) -> (usize, usize) {
        match self.rule().quorum {
            QuorumRule::None => (0, 0),
            QuorumRule::Fixed(n) => (n, n),
            QuorumRule::UpToPool => (1, pool_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_text() {
        for c in [
            ReviewCategory::Exempted,
            ReviewCategory::Expedited,
            ReviewCategory::FullReview,
        ] {
            assert_eq!(ReviewCategory::parse(c.as_str()), Some(c));
        }
        assert_eq!(ReviewCategory::parse("partial"), None);
    }

    #[test]
    fn expedited_quorum_is_exactly_three() {
        assert_eq!(
            ReviewCategory::Expedited.quorum_bounds(10),
            (EXPEDITED_QUORUM, EXPEDITED_QUORUM)
        );
    }

    #[test]
    fn full_review_quorum_tracks_pool_size() {
        assert_eq!(ReviewCategory::FullReview.quorum_bounds(5), (1, 5));
        assert_eq!(ReviewCategory::FullReview.quorum_bounds(12), (1, 12));
    }

    #[test]
    fn exempted_assigns_nobody() {
        assert_eq!(ReviewCategory::Exempted.quorum_bounds(8), (0, 0));
        assert_eq!(ReviewCategory::Exempted.rule().due_offset_days, 0);
    }

    #[test]
    fn due_offsets_per_category() {
        assert_eq!(ReviewCategory::Expedited.rule().due_offset_days, 14);
        assert_eq!(ReviewCategory::FullReview.rule().due_offset_days, 30);
    }
}
