// src/process/coords.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use tracing::trace;

use crate::process::amount::parse_finite;
use crate::process::ParseError;

static LAT_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((.*), (.*)\)").expect("lat/long regex should compile"));

/// A geocoordinate. Only built when both halves parsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub long: f64,
}

/// Pull a `(lat, long)` pair out of a free-text location field.
///
/// Every line is tried against the pattern and the last line that yields two
/// finite floats wins. Lines that match the shape but hold non-numeric groups
/// are ignored.
pub fn extract_lat_long(text: &str) -> Result<Coordinate, ParseError> {
    let mut found = None;
    for line in text.split('\n') {
        let Some(caps) = LAT_LONG.captures(line) else {
            continue;
        };
        let lat = caps.get(1).map_or("", |m| m.as_str());
        let long = caps.get(2).map_or("", |m| m.as_str());
        if let (Ok(lat), Ok(long)) = (parse_finite(lat), parse_finite(long)) {
            found = Some(Coordinate { lat, long });
        }
    }
    found.ok_or(ParseError::NoCoordinate)
}

/// Primary location first; if it yields nothing, the secondary replaces it wholesale.
pub fn locate(primary: Option<&str>, secondary: Option<&str>) -> Option<Coordinate> {
    let found = primary
        .and_then(|t| extract_lat_long(t).ok())
        .or_else(|| secondary.and_then(|t| extract_lat_long(t).ok()));
    if found.is_none() && (primary.is_some() || secondary.is_some()) {
        trace!(?primary, ?secondary, "location treated as missing");
    }
    found
}
