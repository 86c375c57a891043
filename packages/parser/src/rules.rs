//! Field rule table: loads the extraction rules from embedded TOML.
//!
//! `fields.toml` is baked into the binary at compile time via
//! [`include_str!`]. Changing what a field matches or how a category is
//! coded is a config edit rather than a code change.

use std::sync::LazyLock;

use blood_report_models::{ClinicalField, ValueKind};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::ParserError;

/// Rule config embedded at compile time.
const FIELDS_TOML: &str = include_str!("../fields.toml");

static FIELD_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    parse_field_rules(FIELDS_TOML).unwrap_or_else(|e| panic!("Failed to load fields.toml: {e}"))
});

/// How a category keyword is compared against the captured text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatch {
    /// The whole captured value must equal the keyword.
    #[default]
    Exact,
    /// The keyword may appear anywhere in the captured value.
    Contains,
}

/// One entry of a category field's keyword → code table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRule {
    /// Lowercase keyword to look for.
    pub keyword: String,
    /// Integer code stored when the keyword matches.
    pub code: i64,
    /// Comparison mode.
    #[serde(default, rename = "match")]
    pub matching: KeywordMatch,
}

impl CategoryRule {
    /// Returns whether this entry matches an already-lowercased value.
    #[must_use]
    pub fn matches(&self, lowercase_value: &str) -> bool {
        match self.matching {
            KeywordMatch::Exact => lowercase_value == self.keyword,
            KeywordMatch::Contains => lowercase_value.contains(&self.keyword),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    field: Vec<RawFieldRule>,
}

#[derive(Debug, Deserialize)]
struct RawFieldRule {
    name: ClinicalField,
    pattern: String,
    #[serde(default)]
    categories: Vec<CategoryRule>,
}

/// A compiled extraction rule for one clinical field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// The record field this rule fills.
    pub field: ClinicalField,
    /// Case-insensitive pattern; capture group 1 holds the raw value.
    pub pattern: Regex,
    /// Keyword table for category fields, empty otherwise.
    pub categories: Vec<CategoryRule>,
}

/// Returns the compiled rules from the embedded `fields.toml`, in record
/// field order.
///
/// # Panics
///
/// Panics if the embedded config is malformed. The config is compiled into
/// the binary and covered by tests, so this cannot happen at runtime for a
/// tested build.
#[must_use]
pub fn field_rules() -> &'static [FieldRule] {
    &FIELD_RULES
}

/// Returns the rule for `field`.
///
/// # Panics
///
/// Panics under the same conditions as [`field_rules`].
#[must_use]
pub fn rule_for(field: ClinicalField) -> &'static FieldRule {
    // Validation guarantees exactly one rule per field, sorted by field.
    &field_rules()[field_index(field)]
}

fn field_index(field: ClinicalField) -> usize {
    ClinicalField::all()
        .iter()
        .position(|f| *f == field)
        .unwrap_or_default()
}

/// Parses and validates a rule table from TOML.
///
/// The returned rules are ordered like [`ClinicalField::all`].
///
/// # Errors
///
/// * [`ParserError::Config`] if the TOML does not deserialize
/// * [`ParserError::Pattern`] if a pattern fails to compile
/// * [`ParserError::InvalidRule`] if a field is missing, duplicated, has no
///   capture group, or carries categories without being a category field
pub fn parse_field_rules(toml_str: &str) -> Result<Vec<FieldRule>, ParserError> {
    let file: RuleFile = toml::from_str(toml_str)?;

    let mut rules: Vec<FieldRule> = Vec::with_capacity(file.field.len());

    for raw in file.field {
        if rules.iter().any(|r| r.field == raw.name) {
            return Err(ParserError::InvalidRule {
                field: raw.name,
                message: "defined more than once".to_owned(),
            });
        }

        let is_category = raw.name.value_kind() == ValueKind::Category;
        if is_category && raw.categories.is_empty() {
            return Err(ParserError::InvalidRule {
                field: raw.name,
                message: "category field has no categories".to_owned(),
            });
        }
        if !is_category && !raw.categories.is_empty() {
            return Err(ParserError::InvalidRule {
                field: raw.name,
                message: format!("{} field cannot have categories", raw.name.value_kind()),
            });
        }

        let pattern = RegexBuilder::new(&raw.pattern)
            .case_insensitive(true)
            .build()?;
        if pattern.captures_len() < 2 {
            return Err(ParserError::InvalidRule {
                field: raw.name,
                message: "pattern has no capture group".to_owned(),
            });
        }

        let categories = raw
            .categories
            .into_iter()
            .map(|c| CategoryRule {
                keyword: c.keyword.to_lowercase(),
                ..c
            })
            .collect();

        rules.push(FieldRule {
            field: raw.name,
            pattern,
            categories,
        });
    }

    if let Some(missing) = ClinicalField::all()
        .iter()
        .find(|f| !rules.iter().any(|r| r.field == **f))
    {
        return Err(ParserError::InvalidRule {
            field: *missing,
            message: "no rule defined".to_owned(),
        });
    }

    rules.sort_by_key(|r| r.field);

    log::debug!("Loaded {} field rules", rules.len());

    Ok(rules)
}
