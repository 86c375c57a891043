#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the blood report server.
//!
//! Field names are `snake_case` on the wire to stay compatible with the
//! prototype frontend that consumed the original upload service.

use std::collections::BTreeMap;

use blood_report_models::ClinicalRecord;
use serde::{Deserialize, Serialize};

/// Response for a successfully processed upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable status message.
    pub message: String,
    /// Name of the JSON file the record was saved to.
    pub filename: String,
    /// Full path of the saved JSON file.
    pub filepath: String,
    /// Number of characters extracted from the upload.
    pub extracted_text_length: usize,
    /// Leading characters of the extracted text.
    pub extracted_text_preview: String,
    /// The parsed record.
    pub data: ClinicalRecord,
}

/// Response for `POST /parse-text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTextResponse {
    /// Number of fields that were found.
    pub matched_fields: usize,
    /// The parsed record.
    pub data: ClinicalRecord,
}

/// Query parameters for the upload endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    /// Original file name; decides whether the body is read as PDF or text.
    pub filename: Option<String>,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// What went wrong.
    pub detail: String,
}

impl ApiError {
    /// Creates an error body with the given detail message.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIndex {
    /// Service name.
    pub message: String,
    /// Endpoint name to path.
    pub endpoints: BTreeMap<String, String>,
    /// Directory parsed records are saved to.
    pub output_directory: String,
    /// Whether the output directory can be written.
    pub directory_writable: bool,
}

/// Response for `GET /debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDebug {
    /// Directory parsed records are saved to.
    pub output_directory: String,
    /// Whether the output directory can be written.
    pub directory_writable: bool,
    /// Name of the PDF text extraction backend.
    pub pdf_backend: String,
    /// Entries in the output directory, sorted.
    pub files_in_directory: Vec<String>,
}
