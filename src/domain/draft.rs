use crate::domain::documents::DocumentKind;
use serde::{Deserialize, Serialize};

/// One step of the multi-step application, as a discriminated payload. The
/// client saves steps one at a time; nothing reaches the submission
/// aggregate until the whole draft commits at final submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DraftStep {
    ApplicationForm(ApplicationForm),
    ResearchProtocol(ResearchProtocol),
    ConsentForm(ConsentForm),
}

impl DraftStep {
    pub fn kind(&self) -> DocumentKind {
        match self {
            DraftStep::ApplicationForm(_) => DocumentKind::ApplicationForm,
            DraftStep::ResearchProtocol(_) => DocumentKind::ResearchProtocol,
            DraftStep::ConsentForm(_) => DocumentKind::ConsentForm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub principal_investigator: String,
    pub institution: String,
    pub study_site: String,
    pub funding_source: String,
    pub study_duration_months: u32,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchProtocol {
    pub objectives: String,
    pub methodology: String,
    pub participant_count: u32,
    pub inclusion_criteria: String,
    pub risks: String,
    pub data_management: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentForm {
    pub language: String,
    pub procedures_summary: String,
    pub risks_statement: String,
    pub benefits_statement: String,
    pub confidentiality_statement: String,
    pub contact_person: String,
}

/// Accumulated draft, assembled step by step and committed atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftSubmission {
    pub title: String,
    pub application_form: Option<ApplicationForm>,
    pub research_protocol: Option<ResearchProtocol>,
    pub consent_form: Option<ConsentForm>,
}

impl DraftSubmission {
    pub fn apply_step(&mut self, step: DraftStep) {
        match step {
            DraftStep::ApplicationForm(f) => self.application_form = Some(f),
            DraftStep::ResearchProtocol(p) => self.research_protocol = Some(p),
            DraftStep::ConsentForm(c) => self.consent_form = Some(c),
        }
    }

    pub fn missing_steps(&self) -> Vec<DocumentKind> {
        let mut missing = Vec::new();
        if self.application_form.is_none() {
            missing.push(DocumentKind::ApplicationForm);
        }
        if self.research_protocol.is_none() {
            missing.push(DocumentKind::ResearchProtocol);
        }
        if self.consent_form.is_none() {
            missing.push(DocumentKind::ConsentForm);
        }
        missing
    }

    pub fn ready(&self) -> bool {
        !self.title.trim().is_empty() && self.missing_steps().is_empty()
    }

    /// A single-step view, used when a researcher edits one generated form
    /// on an existing submission.
    pub fn for_step(title: &str, step: DraftStep) -> Self {
        let mut draft = DraftSubmission {
            title: title.to_string(),
            ..Default::default()
        };
        draft.apply_step(step);
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consent() -> ConsentForm {
        ConsentForm {
            language: "English".into(),
            procedures_summary: "Two interview sessions".into(),
            risks_statement: "Minimal".into(),
            benefits_statement: "None direct".into(),
            confidentiality_statement: "Pseudonymized transcripts".into(),
            contact_person: "Dr. Reyes".into(),
        }
    }

    #[test]
    fn steps_accumulate_and_report_missing() {
        let mut draft = DraftSubmission {
            title: "Sleep study".into(),
            ..Default::default()
        };
        assert_eq!(draft.missing_steps().len(), 3);
        assert!(!draft.ready());

        draft.apply_step(DraftStep::ConsentForm(consent()));
        assert_eq!(
            draft.missing_steps(),
            vec![DocumentKind::ApplicationForm, DocumentKind::ResearchProtocol]
        );
    }

    #[test]
    fn reapplying_a_step_replaces_it() {
        let mut draft = DraftSubmission::default();
        draft.apply_step(DraftStep::ConsentForm(consent()));
        let mut updated = consent();
        updated.language = "Filipino".into();
        draft.apply_step(DraftStep::ConsentForm(updated));
        assert_eq!(draft.consent_form.unwrap().language, "Filipino");
    }

    #[test]
    fn step_payload_round_trips_with_tag() {
        let step = DraftStep::ConsentForm(consent());
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"step\":\"consent_form\""));
        let back: DraftStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), DocumentKind::ConsentForm);
    }

    #[test]
    fn blank_title_is_not_ready() {
        let mut draft = DraftSubmission::default();
        draft.apply_step(DraftStep::ConsentForm(consent()));
        draft.apply_step(DraftStep::ApplicationForm(ApplicationForm {
            principal_investigator: "A".into(),
            institution: "B".into(),
            study_site: "C".into(),
            funding_source: "D".into(),
            study_duration_months: 6,
            summary: "E".into(),
        }));
        draft.apply_step(DraftStep::ResearchProtocol(ResearchProtocol {
            objectives: "A".into(),
            methodology: "B".into(),
            participant_count: 10,
            inclusion_criteria: "C".into(),
            risks: "D".into(),
            data_management: "E".into(),
        }));
        assert!(!draft.ready());
        draft.title = "Titled".into();
        assert!(draft.ready());
    }
}
