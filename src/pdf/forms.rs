// Form-to-PDF renderers for the generated submission documents.
use super::{load_font_family, RenderError};
use crate::domain::documents::DocumentKind;
use crate::domain::draft::DraftSubmission;
use genpdf::style::Style;
use genpdf::Element;

pub trait FormRenderer: Send + Sync {
    fn kind(&self) -> DocumentKind;
    fn render(&self, draft: &DraftSubmission) -> Result<Vec<u8>, RenderError>;
}

/// The renderer set for the three generated form kinds.
pub struct Renderers {
    renderers: Vec<Box<dyn FormRenderer>>,
}

impl Renderers {
    pub fn standard() -> Self {
        Self {
            renderers: vec![
                Box::new(ApplicationFormRenderer),
                Box::new(ResearchProtocolRenderer),
                Box::new(ConsentFormRenderer),
            ],
        }
    }

    pub fn for_kind(&self, kind: DocumentKind) -> Option<&dyn FormRenderer> {
        self.renderers
            .iter()
            .find(|r| r.kind() == kind)
            .map(|r| r.as_ref())
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn FormRenderer> {
        self.renderers.iter().map(|r| r.as_ref())
    }
}

fn new_form_document(
    study_title: &str,
    heading: &str,
) -> Result<genpdf::Document, RenderError> {
    let font_family = load_font_family()?;
    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(heading);

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    let heading_style = Style::new().bold().with_font_size(18);
    doc.push(genpdf::elements::Paragraph::new(heading).styled(heading_style));
    doc.push(genpdf::elements::Paragraph::new(study_title));
    doc.push(genpdf::elements::Break::new(1.0));
    Ok(doc)
}

fn push_field(doc: &mut genpdf::Document, label: &str, value: &str) {
    let mut paragraph = genpdf::elements::Paragraph::default();
    paragraph.push_styled(format!("{label}: "), Style::new().bold());
    paragraph.push(value.to_string());
    doc.push(paragraph);
    doc.push(genpdf::elements::Break::new(0.3));
}

fn finish(doc: genpdf::Document) -> Result<Vec<u8>, RenderError> {
    let mut out = Vec::new();
    doc.render(&mut out)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(out)
}

struct ApplicationFormRenderer;

impl FormRenderer for ApplicationFormRenderer {
    fn kind(&self) -> DocumentKind {
        DocumentKind::ApplicationForm
    }

    fn render(&self, draft: &DraftSubmission) -> Result<Vec<u8>, RenderError> {
        let form = draft
            .application_form
            .as_ref()
            .ok_or_else(|| RenderError::Pdf("application form step missing".into()))?;

        let mut doc = new_form_document(&draft.title, "Application for Ethics Review")?;
        push_field(&mut doc, "Principal investigator", &form.principal_investigator);
        push_field(&mut doc, "Institution", &form.institution);
        push_field(&mut doc, "Study site", &form.study_site);
        push_field(&mut doc, "Funding source", &form.funding_source);
        push_field(
            &mut doc,
            "Study duration (months)",
            &form.study_duration_months.to_string(),
        );
        push_field(&mut doc, "Summary", &form.summary);
        finish(doc)
    }
}

struct ResearchProtocolRenderer;

impl FormRenderer for ResearchProtocolRenderer {
    fn kind(&self) -> DocumentKind {
        DocumentKind::ResearchProtocol
    }

    fn render(&self, draft: &DraftSubmission) -> Result<Vec<u8>, RenderError> {
        let protocol = draft
            .research_protocol
            .as_ref()
            .ok_or_else(|| RenderError::Pdf("research protocol step missing".into()))?;

        let mut doc = new_form_document(&draft.title, "Research Protocol")?;
        push_field(&mut doc, "Objectives", &protocol.objectives);
        push_field(&mut doc, "Methodology", &protocol.methodology);
        push_field(
            &mut doc,
            "Target participant count",
            &protocol.participant_count.to_string(),
        );
        push_field(&mut doc, "Inclusion criteria", &protocol.inclusion_criteria);
        push_field(&mut doc, "Risks and mitigation", &protocol.risks);
        push_field(&mut doc, "Data management", &protocol.data_management);
        finish(doc)
    }
}

struct ConsentFormRenderer;

impl FormRenderer for ConsentFormRenderer {
    fn kind(&self) -> DocumentKind {
        DocumentKind::ConsentForm
    }

    fn render(&self, draft: &DraftSubmission) -> Result<Vec<u8>, RenderError> {
        let consent = draft
            .consent_form
            .as_ref()
            .ok_or_else(|| RenderError::Pdf("consent form step missing".into()))?;

        let mut doc = new_form_document(&draft.title, "Informed Consent Form")?;
        push_field(&mut doc, "Language", &consent.language);
        push_field(&mut doc, "Procedures", &consent.procedures_summary);
        push_field(&mut doc, "Risks", &consent.risks_statement);
        push_field(&mut doc, "Benefits", &consent.benefits_statement);
        push_field(&mut doc, "Confidentiality", &consent.confidentiality_statement);
        push_field(&mut doc, "Contact person", &consent.contact_person);
        finish(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_exactly_the_generated_kinds() {
        let renderers = Renderers::standard();
        assert!(renderers.for_kind(DocumentKind::ApplicationForm).is_some());
        assert!(renderers.for_kind(DocumentKind::ResearchProtocol).is_some());
        assert!(renderers.for_kind(DocumentKind::ConsentForm).is_some());
        assert!(renderers.for_kind(DocumentKind::EndorsementLetter).is_none());
        assert_eq!(renderers.all().count(), 3);
    }

    #[test]
    fn rendering_a_missing_step_fails() {
        let renderers = Renderers::standard();
        let draft = DraftSubmission {
            title: "Untitled".into(),
            ..Default::default()
        };
        let result = renderers
            .for_kind(DocumentKind::ConsentForm)
            .unwrap()
            .render(&draft);
        assert!(result.is_err());
    }
}
