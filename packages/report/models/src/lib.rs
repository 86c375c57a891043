#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Clinical record and document types for blood report parsing.
//!
//! This crate defines the shapes that flow through the whole system: the
//! transient [`Document`] handed to the text extractor, and the
//! [`ClinicalRecord`] produced by the field parser. Every record field is
//! independently optional, so a report that matches nothing is still a
//! valid (empty) record.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Declared kind of an uploaded document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DocumentKind {
    /// A PDF container whose pages carry a text layer.
    Pdf,
    /// A UTF-8 encoded plain text file.
    Text,
}

impl DocumentKind {
    /// Derives the document kind from an upload's file name.
    ///
    /// Names ending in `.pdf` (in any letter case) are PDFs; everything
    /// else, including an empty name, is treated as plain text.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_lowercase().ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Text
        }
    }
}

/// Raw bytes of an uploaded report together with their declared kind.
///
/// Only lives for the duration of one extraction call.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    /// The raw file contents.
    pub bytes: &'a [u8],
    /// How the bytes should be interpreted.
    pub kind: DocumentKind,
}

impl<'a> Document<'a> {
    /// Creates a new document view over `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8], kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }
}

/// How a field's captured text is turned into a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    /// Base-10 integer.
    Integer,
    /// Floating point number.
    Float,
    /// Categorical keyword mapped to an integer code, or a raw integer code.
    Category,
    /// Captured text kept as-is.
    Verbatim,
}

/// The thirteen cardiac-test attributes extracted from a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClinicalField {
    /// Age in years
    Age,
    /// Sex as written in the report
    Sex,
    /// Chest pain type (0-3)
    Cp,
    /// Resting blood pressure (mmHg)
    Trestbps,
    /// Serum cholesterol (mg/dL)
    Chol,
    /// Fasting blood sugar (0 = normal, 1 = elevated)
    Fbs,
    /// Resting ECG (0 = normal, 1 = ST-T abnormality, 2 = hypertrophy)
    Restecg,
    /// Maximum heart rate achieved
    Thalach,
    /// Exercise induced angina (0 = absent, 1 = present)
    Exang,
    /// ST depression induced by exercise
    Oldpeak,
    /// Slope of the peak exercise ST segment (0 = upward, 1 = flat, 2 = downward)
    Slope,
    /// Number of major vessels
    Ca,
    /// Thalassemia (1 = normal, 2 = fixed defect, 3 = reversible defect)
    Thal,
}

impl ClinicalField {
    /// Returns all fields in record order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Age,
            Self::Sex,
            Self::Cp,
            Self::Trestbps,
            Self::Chol,
            Self::Fbs,
            Self::Restecg,
            Self::Thalach,
            Self::Exang,
            Self::Oldpeak,
            Self::Slope,
            Self::Ca,
            Self::Thal,
        ]
    }

    /// Returns how captured text for this field is normalized.
    #[must_use]
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Age | Self::Cp | Self::Ca => ValueKind::Integer,
            Self::Trestbps | Self::Chol | Self::Thalach | Self::Oldpeak => ValueKind::Float,
            Self::Fbs | Self::Restecg | Self::Exang | Self::Slope | Self::Thal => {
                ValueKind::Category
            }
            Self::Sex => ValueKind::Verbatim,
        }
    }
}

/// Structured cardiac-test values pulled out of a blood report.
///
/// Serializes every field, writing `null` for the ones that were not found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    /// Age in years.
    pub age: Option<i64>,
    /// Sex, verbatim.
    pub sex: Option<String>,
    /// Chest pain type code.
    pub cp: Option<i64>,
    /// Resting blood pressure.
    pub trestbps: Option<f64>,
    /// Serum cholesterol.
    pub chol: Option<f64>,
    /// Fasting blood sugar code.
    pub fbs: Option<i64>,
    /// Resting ECG code.
    pub restecg: Option<i64>,
    /// Maximum heart rate achieved.
    pub thalach: Option<f64>,
    /// Exercise induced angina code.
    pub exang: Option<i64>,
    /// ST depression.
    pub oldpeak: Option<f64>,
    /// ST segment slope code.
    pub slope: Option<i64>,
    /// Number of major vessels.
    pub ca: Option<i64>,
    /// Thalassemia code.
    pub thal: Option<i64>,
}

impl ClinicalRecord {
    /// Returns whether `field` holds a value.
    #[must_use]
    pub const fn has(&self, field: ClinicalField) -> bool {
        match field {
            ClinicalField::Age => self.age.is_some(),
            ClinicalField::Sex => self.sex.is_some(),
            ClinicalField::Cp => self.cp.is_some(),
            ClinicalField::Trestbps => self.trestbps.is_some(),
            ClinicalField::Chol => self.chol.is_some(),
            ClinicalField::Fbs => self.fbs.is_some(),
            ClinicalField::Restecg => self.restecg.is_some(),
            ClinicalField::Thalach => self.thalach.is_some(),
            ClinicalField::Exang => self.exang.is_some(),
            ClinicalField::Oldpeak => self.oldpeak.is_some(),
            ClinicalField::Slope => self.slope.is_some(),
            ClinicalField::Ca => self.ca.is_some(),
            ClinicalField::Thal => self.thal.is_some(),
        }
    }

    /// Number of fields that hold a value.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        ClinicalField::all()
            .iter()
            .filter(|field| self.has(**field))
            .count()
    }

    /// Returns `true` when no field was matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matched_count() == 0
    }
}
