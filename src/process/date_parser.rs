use chrono::NaiveDate;
use tracing::trace;

use crate::process::ParseError;

/// Suffix left behind when the portal's integer dates round-trip through float storage.
const FLOAT_SUFFIX: &str = ".0";

/// Parse `"YYYYMMDD.0"` into a calendar date.
pub fn parse_float_date(s: &str) -> Result<NaiveDate, ParseError> {
    let invalid = || ParseError::InvalidDate(s.to_string());
    let digits = s.strip_suffix(FLOAT_SUFFIX).ok_or_else(invalid)?;
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = digits[0..4].parse().map_err(|_| invalid())?;
    let month: u32 = digits[4..6].parse().map_err(|_| invalid())?;
    let day: u32 = digits[6..8].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// `parse_float_date` coerced onto the missing-sentinel.
pub fn format_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    match parse_float_date(raw) {
        Ok(d) => Some(d),
        Err(e) => {
            trace!(raw, error = %e, "date treated as missing");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_float_encoded_date() {
        assert_eq!(
            format_date(Some("20170304.0")),
            NaiveDate::from_ymd_opt(2017, 3, 4)
        );
    }

    #[test]
    fn malformed_dates_are_missing() {
        for bad in ["abc", "", "20170304", "2017034.0", "201703041.0", "20170230.0", "2017-3-4.0"] {
            assert_eq!(format_date(Some(bad)), None, "{bad:?}");
        }
        assert_eq!(format_date(None), None);
    }

    #[test]
    fn error_carries_input() {
        assert_eq!(
            parse_float_date("abc"),
            Err(ParseError::InvalidDate("abc".into()))
        );
    }
}
