//! Value normalization for captured field text.
//!
//! Each function takes the raw text captured by a field pattern and
//! returns `None` when it cannot be normalized. Callers leave the field
//! unset in that case.

use std::borrow::Cow;

use crate::rules::CategoryRule;

/// Code point of the zero in every run of Unicode decimal digits (`Nd`).
///
/// Each run holds the ten digits zero through nine in order.
const DECIMAL_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6, 0x1E140,
    0x1E2F0, 0x1E950, 0x1FBF0,
];

/// Value of `c` if it is a Unicode decimal digit.
fn decimal_value(c: char) -> Option<u32> {
    let cp = u32::from(c);
    let index = DECIMAL_ZEROS.partition_point(|&zero| zero <= cp);
    let zero = DECIMAL_ZEROS[index.checked_sub(1)?];
    (cp - zero < 10).then_some(cp - zero)
}

/// Rewrites Unicode decimal digits (Arabic-Indic, Devanagari, fullwidth,
/// ...) as ASCII digits so the standard number parsers accept them.
fn ascii_digits(raw: &str) -> Cow<'_, str> {
    if raw.is_ascii() {
        return Cow::Borrowed(raw);
    }

    raw.chars()
        .map(|c| {
            decimal_value(c)
                .and_then(|d| char::from_digit(d, 10))
                .unwrap_or(c)
        })
        .collect()
}

/// Parses a base-10 integer, ignoring surrounding whitespace.
///
/// Digits from any Unicode script are accepted.
#[must_use]
pub fn parse_integer(raw: &str) -> Option<i64> {
    ascii_digits(raw.trim()).parse::<i64>().ok()
}

/// Parses a floating point number, ignoring surrounding whitespace.
///
/// Digits from any Unicode script are accepted.
#[must_use]
pub fn parse_float(raw: &str) -> Option<f64> {
    ascii_digits(raw.trim()).parse::<f64>().ok()
}

/// Maps a categorical value to its integer code.
///
/// Keywords are tried in table order against the lowercased value. When
/// none match, a numeric value is taken as the code itself.
#[must_use]
pub fn category_code(categories: &[CategoryRule], raw: &str) -> Option<i64> {
    let lower = raw.trim().to_lowercase();

    categories
        .iter()
        .find(|c| c.matches(&lower))
        .map(|c| c.code)
        .or_else(|| parse_integer(&lower))
}
