#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Blood report pipeline.
//!
//! Ties the text extractor and the field parser together for one uploaded
//! document, and persists the resulting [`ClinicalRecord`] as a
//! timestamped JSON file (see [`persist`]).

pub mod persist;

pub use blood_report_extract::ExtractError;
use blood_report_models::{ClinicalRecord, Document};

/// Number of characters of extracted text echoed back to callers.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Errors that can occur while processing or saving a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Text extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Extraction succeeded but produced only whitespace.
    #[error("No text extracted from file")]
    EmptyText,

    /// Writing the record to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The outcome of running one document through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedReport {
    /// Full extracted text.
    pub text: String,
    /// Fields parsed out of the text.
    pub record: ClinicalRecord,
}

impl ProcessedReport {
    /// Number of characters in the extracted text.
    #[must_use]
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns the first `limit` characters of the extracted text.
    #[must_use]
    pub fn preview(&self, limit: usize) -> &str {
        self.text
            .char_indices()
            .nth(limit)
            .map_or(self.text.as_str(), |(end, _)| &self.text[..end])
    }
}

/// Extracts and parses one document.
///
/// # Errors
///
/// * [`ReportError::Extract`] if the document cannot be turned into text
/// * [`ReportError::EmptyText`] if the extracted text is blank
pub fn process(document: &Document<'_>) -> Result<ProcessedReport, ReportError> {
    let text = blood_report_extract::extract(document)?;

    if text.trim().is_empty() {
        log::warn!(
            "No text extracted from {} byte {} upload",
            document.bytes.len(),
            document.kind
        );
        return Err(ReportError::EmptyText);
    }

    let record = blood_report_parser::parse(&text);

    log::info!(
        "Parsed {} of {} clinical fields from {} upload",
        record.matched_count(),
        blood_report_models::ClinicalField::all().len(),
        document.kind
    );

    Ok(ProcessedReport { text, record })
}

#[cfg(test)]
mod tests {
    use blood_report_models::DocumentKind;

    use lopdf::content::{Content, Operation};
    use lopdf::{Document as PdfDocument, Object, Stream, dictionary};

    use super::*;

    /// One `Courier` text line per page.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let kids: Vec<Object> = pages
            .iter()
            .map(|text| {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id =
                    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                })
                .into()
            })
            .collect();

        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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

    #[test]
    fn processes_text_report() {
        let body = "Age/Sex 45 Years/Male\nSerum Cholesterol 233\n";
        let report = process(&Document::new(body.as_bytes(), DocumentKind::Text)).unwrap();
        assert_eq!(report.text, body);
        assert_eq!(report.record.age, Some(45));
        assert_eq!(report.record.chol, Some(233.0));
    }

    #[test]
    fn fields_split_across_pdf_pages_are_all_found() {
        let bytes = pdf_with_pages(&["Age/Sex 30 Years/Male", "Chest Pain Type (cp) 2"]);
        let report = process(&Document::new(&bytes, DocumentKind::Pdf)).unwrap();

        assert_eq!(report.record.age, Some(30));
        assert_eq!(report.record.sex.as_deref(), Some("Male"));
        assert_eq!(report.record.cp, Some(2));
        assert_eq!(report.record.matched_count(), 3);
    }

    #[test]
    fn text_with_no_labels_is_still_a_successful_report() {
        let report =
            process(&Document::new(b"Hemoglobin 13.5 g/dL", DocumentKind::Text)).unwrap();
        assert!(report.record.is_empty());
    }

    #[test]
    fn blank_text_is_rejected() {
        let result = process(&Document::new(b"  \n\t ", DocumentKind::Text));
        assert!(matches!(result, Err(ReportError::EmptyText)));
    }

    #[test]
    fn invalid_encoding_never_yields_a_record() {
        let result = process(&Document::new(&[0xc3, 0x28], DocumentKind::Text));
        assert!(matches!(
            result,
            Err(ReportError::Extract(ExtractError::InvalidEncoding(_)))
        ));
    }

    #[test]
    fn malformed_pdf_is_an_extract_error() {
        let result = process(&Document::new(b"not a pdf", DocumentKind::Pdf));
        assert!(matches!(
            result,
            Err(ReportError::Extract(ExtractError::MalformedDocument(_)))
        ));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let report = ProcessedReport {
            text: "äöü report".to_owned(),
            record: ClinicalRecord::default(),
        };
        assert_eq!(report.preview(3), "äöü");
        assert_eq!(report.preview(100), "äöü report");
        assert_eq!(report.text_length(), 10);
    }
}
