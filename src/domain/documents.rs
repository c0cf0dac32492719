use crate::error::GuardViolation;
use serde::{Deserialize, Serialize};

/// Every artifact kind a submission can carry. The first three are rendered
/// from the researcher's form steps, the next three are uploaded
/// attachments, the last two are system-generated outputs exempt from
/// verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ApplicationForm,
    ResearchProtocol,
    ConsentForm,
    ResearchInstrument,
    ProposalDefense,
    EndorsementLetter,
    ConsolidatedApplication,
    Certificate,
}

/// Consolidation appends generated forms first, then attachments, always in
/// this order.
pub const GENERATED_KINDS: [DocumentKind; 3] = [
    DocumentKind::ApplicationForm,
    DocumentKind::ResearchProtocol,
    DocumentKind::ConsentForm,
];

pub const ATTACHMENT_KINDS: [DocumentKind; 3] = [
    DocumentKind::ResearchInstrument,
    DocumentKind::ProposalDefense,
    DocumentKind::EndorsementLetter,
];

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ApplicationForm => "application_form",
            DocumentKind::ResearchProtocol => "research_protocol",
            DocumentKind::ConsentForm => "consent_form",
            DocumentKind::ResearchInstrument => "research_instrument",
            DocumentKind::ProposalDefense => "proposal_defense",
            DocumentKind::EndorsementLetter => "endorsement_letter",
            DocumentKind::ConsolidatedApplication => "consolidated_application",
            DocumentKind::Certificate => "certificate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "application_form" => DocumentKind::ApplicationForm,
            "research_protocol" => DocumentKind::ResearchProtocol,
            "consent_form" => DocumentKind::ConsentForm,
            "research_instrument" => DocumentKind::ResearchInstrument,
            "proposal_defense" => DocumentKind::ProposalDefense,
            "endorsement_letter" => DocumentKind::EndorsementLetter,
            "consolidated_application" => DocumentKind::ConsolidatedApplication,
            "certificate" => DocumentKind::Certificate,
            _ => return None,
        })
    }

    pub fn is_generated_form(&self) -> bool {
        GENERATED_KINDS.contains(self)
    }

    pub fn is_attachment(&self) -> bool {
        ATTACHMENT_KINDS.contains(self)
    }

    /// System outputs are excluded from the verification set.
    pub fn requires_verification(&self) -> bool {
        !matches!(
            self,
            DocumentKind::ConsolidatedApplication | DocumentKind::Certificate
        )
    }

    /// Banner title printed on the separator page ahead of an attachment.
    pub fn separator_title(&self) -> &'static str {
        match self {
            DocumentKind::ResearchInstrument => "Research Instrument",
            DocumentKind::ProposalDefense => "Proposal Defense Certification",
            DocumentKind::EndorsementLetter => "Endorsement Letter",
            _ => "",
        }
    }
}

/// Verification sub-state of one document, with the snapshot that makes a
/// single-step undo possible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationFields {
    pub is_verified: Option<bool>,
    pub comment: String,
    pub prev_is_verified: Option<bool>,
    pub prev_comment: Option<String>,
    pub has_prev: bool,
}

/// Records the prior state, then applies the new one. Returns false (and
/// leaves everything, snapshot included, untouched) when the requested state
/// equals the current state, so repeating a call cannot rotate the snapshot
/// onto itself.
pub fn apply_verify(fields: &mut VerificationFields, approved: bool, comment: &str) -> bool {
    if fields.is_verified == Some(approved) && fields.comment == comment {
        return false;
    }
    fields.prev_is_verified = fields.is_verified;
    fields.prev_comment = Some(fields.comment.clone());
    fields.has_prev = true;
    fields.is_verified = Some(approved);
    fields.comment = comment.to_string();
    true
}

/// Restores the exact prior (is_verified, comment) tuple. A second undo with
/// no intervening verify fails.
pub fn apply_undo(fields: &mut VerificationFields) -> Result<(), GuardViolation> {
    if !fields.has_prev {
        return Err(GuardViolation::NoPriorState);
    }
    fields.is_verified = fields.prev_is_verified;
    fields.comment = fields.prev_comment.take().unwrap_or_default();
    fields.prev_is_verified = None;
    fields.has_prev = false;
    Ok(())
}

/// Derived aggregate over the non-consolidated documents of a submission.
/// Purely in-memory; no I/O happens here.
pub struct VerificationSet {
    entries: Vec<(DocumentKind, Option<bool>)>,
}

impl VerificationSet {
    pub fn new(entries: Vec<(DocumentKind, Option<bool>)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(kind, _)| kind.requires_verification())
                .collect(),
        }
    }

    pub fn all_approved(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|(_, v)| *v == Some(true))
    }

    pub fn any_rejected(&self) -> bool {
        self.entries.iter().any(|(_, v)| *v == Some(false))
    }

    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|(_, v)| v.is_none()).count()
    }

    pub fn rejected(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, v)| *v == Some(false))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            DocumentKind::ApplicationForm,
            DocumentKind::ResearchProtocol,
            DocumentKind::ConsentForm,
            DocumentKind::ResearchInstrument,
            DocumentKind::ProposalDefense,
            DocumentKind::EndorsementLetter,
            DocumentKind::ConsolidatedApplication,
            DocumentKind::Certificate,
        ] {
            assert_eq!(DocumentKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn system_outputs_skip_verification() {
        assert!(!DocumentKind::ConsolidatedApplication.requires_verification());
        assert!(!DocumentKind::Certificate.requires_verification());
        assert!(DocumentKind::ConsentForm.requires_verification());
        assert!(DocumentKind::EndorsementLetter.requires_verification());
    }

    #[test]
    fn verify_snapshots_prior_state() {
        let mut f = VerificationFields::default();
        assert!(apply_verify(&mut f, true, "looks complete"));
        assert_eq!(f.is_verified, Some(true));
        assert_eq!(f.comment, "looks complete");
        assert!(f.has_prev);
        assert_eq!(f.prev_is_verified, None);
        assert_eq!(f.prev_comment.as_deref(), Some(""));
    }

    #[test]
    fn undo_restores_exact_prior_tuple() {
        let mut f = VerificationFields::default();
        apply_verify(&mut f, false, "missing signature page");
        apply_verify(&mut f, true, "signature added");

        apply_undo(&mut f).unwrap();
        assert_eq!(f.is_verified, Some(false));
        assert_eq!(f.comment, "missing signature page");
    }

    #[test]
    fn double_undo_fails_with_no_prior_state() {
        let mut f = VerificationFields::default();
        apply_verify(&mut f, true, "");
        apply_undo(&mut f).unwrap();
        assert_eq!(apply_undo(&mut f), Err(GuardViolation::NoPriorState));
    }

    #[test]
    fn identical_verify_is_idempotent_and_preserves_snapshot() {
        let mut f = VerificationFields::default();
        apply_verify(&mut f, false, "wrong template");
        apply_verify(&mut f, true, "fixed");

        // Repeat the same call: nothing changes, including the snapshot.
        assert!(!apply_verify(&mut f, true, "fixed"));
        assert_eq!(f.prev_is_verified, Some(false));
        assert_eq!(f.prev_comment.as_deref(), Some("wrong template"));

        apply_undo(&mut f).unwrap();
        assert_eq!(f.is_verified, Some(false));
        assert_eq!(f.comment, "wrong template");
    }

    #[test]
    fn aggregate_predicates() {
        let set = VerificationSet::new(vec![
            (DocumentKind::ApplicationForm, Some(true)),
            (DocumentKind::ResearchProtocol, None),
            (DocumentKind::ConsentForm, Some(false)),
            (DocumentKind::ConsolidatedApplication, None),
        ]);
        assert!(!set.all_approved());
        assert!(set.any_rejected());
        assert_eq!(set.pending(), 1);
        assert_eq!(set.rejected(), 1);

        let approved = VerificationSet::new(vec![
            (DocumentKind::ApplicationForm, Some(true)),
            (DocumentKind::ConsentForm, Some(true)),
        ]);
        assert!(approved.all_approved());
        assert!(!approved.any_rejected());
    }

    #[test]
    fn empty_set_is_not_approved() {
        let set = VerificationSet::new(vec![]);
        assert!(!set.all_approved());
    }
}
