#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Text extraction from uploaded blood reports.
//!
//! Turns the raw bytes of an upload into one Unicode string. PDFs go
//! through pure-Rust text extraction ([`pdf_extract`]) page by page and the
//! page texts are joined in order; plain text uploads are decoded as UTF-8
//! with no fallback encoding.
//!
//! Extraction is a pure transformation: no network or filesystem access.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use blood_report_models::{Document, DocumentKind};

/// Inserted between consecutive PDF page texts.
///
/// Empty, so the last word of one page can run into the first word of the
/// next.
pub const PAGE_SEPARATOR: &str = "";

/// Errors that can occur while extracting text from a document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The bytes were declared as PDF but could not be parsed as one.
    #[error("Malformed PDF document: {0}")]
    MalformedDocument(String),

    /// The bytes were declared as plain text but are not valid UTF-8.
    #[error("Invalid UTF-8 encoding: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),
}

/// Extracts the full text of `document` according to its declared kind.
///
/// # Errors
///
/// * [`ExtractError::MalformedDocument`] if a PDF cannot be parsed
/// * [`ExtractError::InvalidEncoding`] if a text upload is not UTF-8
pub fn extract(document: &Document<'_>) -> Result<String, ExtractError> {
    log::debug!(
        "Extracting text from {} bytes declared as {}",
        document.bytes.len(),
        document.kind
    );

    let text = match document.kind {
        DocumentKind::Pdf => extract_pdf(document.bytes)?,
        DocumentKind::Text => decode_text(document.bytes)?,
    };

    log::debug!("Extracted {} characters of text", text.chars().count());

    Ok(text)
}

/// Extracts and joins the text of every page of a PDF, in page order.
///
/// A page that fails to extract fails the whole document; no page is
/// dropped silently.
///
/// # Errors
///
/// Returns [`ExtractError::MalformedDocument`] if the PDF container cannot
/// be parsed, its page tree is damaged, or any page's content cannot be
/// interpreted.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed content (missing fonts, bad
    // object types) instead of returning an error.
    let pages = panic::catch_unwind(AssertUnwindSafe(|| extract_pages(bytes))).map_err(
        |payload| {
            let message = panic_message(payload.as_ref());
            log::warn!("PDF extraction panicked: {message}");
            ExtractError::MalformedDocument(message)
        },
    )??;

    log::debug!("PDF loaded, {} page(s)", pages.len());
    for (i, page) in pages.iter().enumerate() {
        log::debug!("Page {} extracted {} characters", i + 1, page.chars().count());
    }

    Ok(join_pages(&pages))
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut doc = pdf_extract::Document::load_mem(bytes).map_err(malformed)?;
    if doc.is_encrypted() {
        doc.decrypt("").map_err(malformed)?;
    }

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(ExtractError::MalformedDocument(
            "document has no pages".to_string(),
        ));
    }
    if let Some(declared) = declared_page_count(&doc)
        && declared != page_numbers.len()
    {
        return Err(ExtractError::MalformedDocument(format!(
            "page tree declares {declared} page(s) but {} are reachable",
            page_numbers.len()
        )));
    }

    page_numbers
        .into_iter()
        .map(|page_num| {
            let mut text = String::new();
            {
                let mut output = pdf_extract::PlainTextOutput::new(&mut text);
                pdf_extract::output_doc_page(&doc, &mut output, page_num).map_err(|e| {
                    ExtractError::MalformedDocument(format!("page {page_num}: {e}"))
                })?;
            }
            Ok(text)
        })
        .collect()
}

/// The `/Count` of the root page tree node, if it can be read.
fn declared_page_count(doc: &pdf_extract::Document) -> Option<usize> {
    let pages_id = doc.catalog().ok()?.get(b"Pages").ok()?.as_reference().ok()?;
    let count = doc.get_dictionary(pages_id).ok()?.get(b"Count").ok()?.as_i64().ok()?;
    usize::try_from(count).ok()
}

#[allow(clippy::needless_pass_by_value)]
fn malformed<E: std::fmt::Display>(e: E) -> ExtractError {
    ExtractError::MalformedDocument(e.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "PDF content could not be interpreted".to_string())
}

/// Decodes a plain text upload.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidEncoding`] if `bytes` is not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> Result<String, ExtractError> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Joins page texts in order using [`PAGE_SEPARATOR`].
#[must_use]
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
