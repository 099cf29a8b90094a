// src/process/amount.rs
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::process::ParseError;

static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(.*)").expect("dollar amount regex should compile"));

/// Parse a `$<number>` string into its numeric value.
///
/// Only a leading `$` is stripped; commas and other separators are left
/// in place and will fail the numeric parse.
pub fn parse_amount(raw: &str) -> Result<f64, ParseError> {
    let caps = DOLLAR_AMOUNT
        .captures(raw)
        .ok_or(ParseError::MissingDollarSign)?;
    let remainder = caps.get(1).map_or("", |m| m.as_str());
    parse_finite(remainder)
}

/// `parse_amount` collapsed onto the missing-sentinel.
pub fn amount_to_float(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    match parse_amount(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(raw, error = %e, "amount treated as missing");
            None
        }
    }
}

/// Numeric parse tolerant of surrounding whitespace; NaN and infinities count as a failure.
pub(crate) fn parse_finite(s: &str) -> Result<f64, ParseError> {
    let trimmed = s.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber(trimmed.to_string())),
    }
}
