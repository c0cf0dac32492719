// PDF generation and consolidation.
// genpdf needs Liberation or similar fonts in standard paths.
pub mod forms;
mod merge;

pub use merge::{consolidate, Consolidated, ConsolidationError, ConsolidationPart};

use genpdf::style::{Color, Style};
use genpdf::{Alignment, Element};
use thiserror::Error;

const BANNER_COLOR: Color = Color::Rgb(31, 78, 121);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font configuration: {0}")]
    Fonts(String),

    #[error("pdf generation: {0}")]
    Pdf(String),
}

/// Try common font paths - genpdf needs actual font files for metrics.
pub fn load_font_family() -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, RenderError>
{
    let font_paths = [
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
    ];

    font_paths
        .iter()
        .find(|p| std::path::Path::new(p).exists())
        .and_then(|path| {
            ["LiberationSans", "DejaVuSans", "Arial"]
                .iter()
                .find_map(|name| genpdf::fonts::from_files(*path, name, None).ok())
        })
        .ok_or_else(|| {
            RenderError::Fonts("No suitable fonts found. Install: apt install fonts-liberation".into())
        })
}

/// One-page banner inserted ahead of each uploaded attachment in the
/// consolidated document.
pub fn render_separator(title: &str) -> Result<Vec<u8>, RenderError> {
    let font_family = load_font_family()?;
    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(title);

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(20);
    doc.set_page_decorator(decorator);

    let banner_style = Style::new()
        .bold()
        .with_font_size(26)
        .with_color(BANNER_COLOR);

    doc.push(genpdf::elements::Break::new(8.0));
    doc.push(
        genpdf::elements::Paragraph::new(title)
            .aligned(Alignment::Center)
            .styled(banner_style)
            .framed(),
    );

    let mut out = Vec::new();
    doc.render(&mut out)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
pub enum CertificateKind {
    Approval,
    Exemption,
}

impl CertificateKind {
    fn heading(&self) -> &'static str {
        match self {
            CertificateKind::Approval => "Certificate of Ethics Approval",
            CertificateKind::Exemption => "Certificate of Exemption from Review",
        }
    }

    fn body(&self) -> &'static str {
        match self {
            CertificateKind::Approval => {
                "has been reviewed and approved by the Research Ethics Committee"
            }
            CertificateKind::Exemption => {
                "has been classified as exempt from research ethics review"
            }
        }
    }
}

pub fn generate_certificate(
    kind: CertificateKind,
    study_title: &str,
    tracking_code: &str,
) -> Result<Vec<u8>, RenderError> {
    let font_family = load_font_family()?;
    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(kind.heading());

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let title_style = Style::new().bold().with_font_size(24).with_color(BANNER_COLOR);
    doc.push(genpdf::elements::Paragraph::new(kind.heading()).styled(title_style));
    doc.push(genpdf::elements::Break::new(1.0));

    let title = if study_title.len() > 80 {
        format!("{}...", &study_title[..80])
    } else {
        study_title.to_string()
    };
    doc.push(genpdf::elements::Paragraph::new(title));
    doc.push(genpdf::elements::Break::new(0.5));
    doc.push(genpdf::elements::Paragraph::new(kind.body()));
    doc.push(genpdf::elements::Break::new(0.5));

    let date = chrono::Utc::now().format("%B %d, %Y").to_string();
    doc.push(genpdf::elements::Paragraph::new(format!("Date: {}", date)));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Tracking code: {}",
        tracking_code
    )));

    let mut out = Vec::new();
    doc.render(&mut out)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(out)
}
