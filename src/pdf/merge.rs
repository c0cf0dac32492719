// Object-level merge of submission artifacts into one consolidated PDF.
use crate::domain::documents::DocumentKind;
use lopdf::{dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// Every part failed to parse; nothing could be produced.
    #[error("no pages could be merged")]
    Empty,

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One input artifact, in final consolidation order.
pub struct ConsolidationPart {
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

pub struct Consolidated {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub merged: Vec<DocumentKind>,
    pub skipped: Vec<DocumentKind>,
}

/// Merges the parts in order, inserting a one-page separator banner ahead of
/// each uploaded attachment. A part that fails to parse is logged and
/// skipped (as is its banner); a banner that fails to materialize is skipped
/// while its attachment still merges. Only producing zero pages is fatal.
pub fn consolidate<F>(
    parts: Vec<ConsolidationPart>,
    separator: F,
) -> Result<Consolidated, ConsolidationError>
where
    F: Fn(&str) -> Option<Vec<u8>>,
{
    let mut sections: Vec<Document> = Vec::new();
    let mut merged = Vec::new();
    let mut skipped = Vec::new();

    for part in parts {
        let doc = match Document::load_mem(&part.bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("consolidation: skipping {}: {}", part.kind.as_str(), e);
                skipped.push(part.kind);
                continue;
            }
        };

        if part.kind.is_attachment() {
            match separator(part.kind.separator_title()).map(|b| Document::load_mem(&b)) {
                Some(Ok(banner)) => sections.push(banner),
                Some(Err(e)) => warn!(
                    "consolidation: separator for {} unreadable, continuing without: {}",
                    part.kind.as_str(),
                    e
                ),
                None => warn!(
                    "consolidation: no separator for {}, continuing without",
                    part.kind.as_str()
                ),
            }
        }

        sections.push(doc);
        merged.push(part.kind);
    }

    if sections.is_empty() {
        return Err(ConsolidationError::Empty);
    }

    let (mut document, page_count) = merge_documents(sections)?;

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;

    Ok(Consolidated {
        bytes,
        page_count,
        merged,
        skipped,
    })
}

const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page-tree nodes may carry attributes their pages inherit; the merge drops
/// those nodes, so the attributes must land on the pages first.
fn flatten_inherited(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let mut to_set: Vec<(Vec<u8>, Object)> = Vec::new();
        for key in INHERITABLE_KEYS {
            if page_has_key(doc, page_id, key) {
                continue;
            }
            if let Some(value) = find_inherited(doc, page_id, key) {
                to_set.push((key.to_vec(), value));
            }
        }
        if to_set.is_empty() {
            continue;
        }
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            for (key, value) in to_set {
                dict.set(key, value);
            }
        }
    }
}

fn page_has_key(doc: &Document, page_id: ObjectId, key: &[u8]) -> bool {
    doc.get_object(page_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .map(|d| d.has(key))
        .unwrap_or(false)
}

fn find_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // Bounded walk in case of a malformed circular parent chain.
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if current != page_id {
            if let Ok(value) = dict.get(key) {
                return Some(value.clone());
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn object_type(object: &Object) -> Option<Vec<u8>> {
    object
        .as_dict()
        .ok()
        .and_then(|d| d.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
        .map(|n| n.to_vec())
}

fn merge_documents(docs: Vec<Document>) -> Result<(Document, usize), ConsolidationError> {
    let mut merged = Document::with_version("1.5");
    let mut max_id: u32 = 1;
    let mut page_order: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in docs {
        flatten_inherited(&mut doc);
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let mut pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        pages.sort_by_key(|(number, _)| *number);
        page_order.extend(pages.into_iter().map(|(_, id)| id));

        // Old catalogs and page-tree nodes get rebuilt below.
        for (id, object) in std::mem::take(&mut doc.objects) {
            match object_type(&object).as_deref() {
                Some(b"Catalog") | Some(b"Pages") | Some(b"Outlines") | Some(b"Outline") => {}
                _ => {
                    objects.insert(id, object);
                }
            }
        }
    }

    if page_order.is_empty() {
        return Err(ConsolidationError::Empty);
    }

    let pages_id: ObjectId = (max_id, 0);
    let catalog_id: ObjectId = (max_id + 1, 0);

    for page_id in &page_order {
        if let Some(Object::Dictionary(dict)) = objects.get_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let kids: Vec<Object> = page_order
        .iter()
        .map(|id| Object::Reference(*id))
        .collect();
    objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_order.len() as i64,
            "Kids" => kids,
        }),
    );
    objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        }),
    );

    let page_count = page_order.len();
    merged.objects = objects;
    merged.max_id = catalog_id.0;
    merged.trailer.set("Root", Object::Reference(catalog_id));
    merged.renumber_objects();
    merged.compress();
    Ok((merged, page_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal valid PDF with the given number of blank pages; built with
    /// lopdf directly so tests need no fonts.
    fn fixture_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(595),
                        Object::Integer(842),
                    ],
                });
                Object::Reference(page_id)
            })
            .collect();
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn one_page_separator(_title: &str) -> Option<Vec<u8>> {
        Some(fixture_pdf(1))
    }

    #[test]
    fn merges_in_order_with_one_separator_per_attachment() {
        let parts = vec![
            ConsolidationPart {
                kind: DocumentKind::ApplicationForm,
                bytes: fixture_pdf(2),
            },
            ConsolidationPart {
                kind: DocumentKind::ResearchProtocol,
                bytes: fixture_pdf(3),
            },
            ConsolidationPart {
                kind: DocumentKind::ConsentForm,
                bytes: fixture_pdf(1),
            },
            ConsolidationPart {
                kind: DocumentKind::ResearchInstrument,
                bytes: fixture_pdf(2),
            },
            ConsolidationPart {
                kind: DocumentKind::EndorsementLetter,
                bytes: fixture_pdf(1),
            },
        ];

        let out = consolidate(parts, one_page_separator).unwrap();
        // 2 + 3 + 1 generated, plus (1 separator + 2) and (1 separator + 1).
        assert_eq!(out.page_count, 11);
        assert_eq!(out.merged.len(), 5);
        assert!(out.skipped.is_empty());

        let reloaded = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 11);
    }

    #[test]
    fn unparseable_attachment_is_skipped_with_its_separator() {
        let parts = vec![
            ConsolidationPart {
                kind: DocumentKind::ApplicationForm,
                bytes: fixture_pdf(2),
            },
            ConsolidationPart {
                kind: DocumentKind::ResearchInstrument,
                bytes: b"not a pdf at all".to_vec(),
            },
        ];

        let out = consolidate(parts, one_page_separator).unwrap();
        assert_eq!(out.page_count, 2);
        assert_eq!(out.merged, vec![DocumentKind::ApplicationForm]);
        assert_eq!(out.skipped, vec![DocumentKind::ResearchInstrument]);
    }

    #[test]
    fn missing_separator_still_merges_the_attachment() {
        let parts = vec![ConsolidationPart {
            kind: DocumentKind::EndorsementLetter,
            bytes: fixture_pdf(2),
        }];

        let out = consolidate(parts, |_| None).unwrap();
        assert_eq!(out.page_count, 2);
        assert_eq!(out.merged, vec![DocumentKind::EndorsementLetter]);
    }

    #[test]
    fn nothing_mergeable_is_a_hard_failure() {
        let parts = vec![
            ConsolidationPart {
                kind: DocumentKind::ApplicationForm,
                bytes: b"garbage".to_vec(),
            },
            ConsolidationPart {
                kind: DocumentKind::ConsentForm,
                bytes: Vec::new(),
            },
        ];

        assert!(matches!(
            consolidate(parts, one_page_separator),
            Err(ConsolidationError::Empty)
        ));
    }

    #[test]
    fn generated_forms_get_no_separator() {
        let parts = vec![
            ConsolidationPart {
                kind: DocumentKind::ApplicationForm,
                bytes: fixture_pdf(1),
            },
            ConsolidationPart {
                kind: DocumentKind::ConsentForm,
                bytes: fixture_pdf(1),
            },
        ];

        let out = consolidate(parts, one_page_separator).unwrap();
        assert_eq!(out.page_count, 2);
    }

    #[test]
    fn merged_output_is_reloadable() {
        let parts = vec![
            ConsolidationPart {
                kind: DocumentKind::ResearchProtocol,
                bytes: fixture_pdf(4),
            },
            ConsolidationPart {
                kind: DocumentKind::ProposalDefense,
                bytes: fixture_pdf(1),
            },
        ];

        let out = consolidate(parts, one_page_separator).unwrap();
        let reloaded = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), out.page_count);
        assert_eq!(out.page_count, 6);
    }
}
