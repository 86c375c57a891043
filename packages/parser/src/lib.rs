#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rule-driven clinical field parser for blood report text.
//!
//! Runs one case-insensitive search per [`ClinicalField`] over the report
//! text and normalizes whatever the first match captured. A field whose
//! pattern does not match, or whose capture cannot be normalized, is simply
//! left unset: [`parse`] never fails.
//!
//! The patterns and category code tables live in `fields.toml`; see
//! [`rules`].

pub mod normalize;
pub mod rules;

use blood_report_models::{ClinicalField, ClinicalRecord, ValueKind};

use crate::normalize::{category_code, parse_float, parse_integer};
use crate::rules::{FieldRule, field_rules, rule_for};

/// Errors raised while loading a field rule table.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    /// The rule TOML could not be deserialized.
    #[error("Invalid rule config: {0}")]
    Config(#[from] toml::de::Error),

    /// A field pattern failed to compile.
    #[error("Invalid field pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A rule is structurally wrong for its field.
    #[error("Invalid rule for {field}: {message}")]
    InvalidRule {
        /// The field the rule belongs to.
        field: ClinicalField,
        /// What is wrong with it.
        message: String,
    },
}

/// Returns the trimmed text captured by `rule` at its first match in
/// `text`, if any.
#[must_use]
pub fn capture<'t>(rule: &FieldRule, text: &'t str) -> Option<&'t str> {
    rule.pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn integer(field: ClinicalField, text: &str) -> Option<i64> {
    debug_assert_eq!(field.value_kind(), ValueKind::Integer);
    let raw = matched(field, text)?;
    let value = parse_integer(raw);
    if value.is_none() {
        log::debug!("Discarding {field}: '{raw}' is not an integer");
    }
    value
}

fn float(field: ClinicalField, text: &str) -> Option<f64> {
    debug_assert_eq!(field.value_kind(), ValueKind::Float);
    let raw = matched(field, text)?;
    let value = parse_float(raw);
    if value.is_none() {
        log::debug!("Discarding {field}: '{raw}' is not a number");
    }
    value
}

fn category(field: ClinicalField, text: &str) -> Option<i64> {
    debug_assert_eq!(field.value_kind(), ValueKind::Category);
    let raw = matched(field, text)?;
    let value = category_code(&rule_for(field).categories, raw);
    if value.is_none() {
        log::debug!("Discarding {field}: '{raw}' matches no category");
    }
    value
}

fn verbatim(field: ClinicalField, text: &str) -> Option<String> {
    debug_assert_eq!(field.value_kind(), ValueKind::Verbatim);
    matched(field, text).map(str::to_owned)
}

fn matched(field: ClinicalField, text: &str) -> Option<&str> {
    let raw = capture(rule_for(field), text)?;
    log::debug!("Found {field}: {raw}");
    Some(raw)
}

/// Parses report text into a [`ClinicalRecord`].
///
/// Every field is searched independently; unmatched or unparseable fields
/// stay `None`. Parsing holds no state, so the same text always yields the
/// same record.
#[must_use]
pub fn parse(text: &str) -> ClinicalRecord {
    log::debug!("Parsing text of length {}", text.chars().count());

    let record = ClinicalRecord {
        age: integer(ClinicalField::Age, text),
        sex: verbatim(ClinicalField::Sex, text),
        cp: integer(ClinicalField::Cp, text),
        trestbps: float(ClinicalField::Trestbps, text),
        chol: float(ClinicalField::Chol, text),
        fbs: category(ClinicalField::Fbs, text),
        restecg: category(ClinicalField::Restecg, text),
        thalach: float(ClinicalField::Thalach, text),
        exang: category(ClinicalField::Exang, text),
        oldpeak: float(ClinicalField::Oldpeak, text),
        slope: category(ClinicalField::Slope, text),
        ca: integer(ClinicalField::Ca, text),
        thal: category(ClinicalField::Thal, text),
    };

    log::debug!(
        "Matched {}/{} fields",
        record.matched_count(),
        field_rules().len()
    );

    record
}
