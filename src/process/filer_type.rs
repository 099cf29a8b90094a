use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a registered filer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilerType {
    Candidate,
    Committee,
    Lobbyist,
    Unknown,
}

impl FilerType {
    pub const ALL: [FilerType; 4] = [
        FilerType::Candidate,
        FilerType::Committee,
        FilerType::Lobbyist,
        FilerType::Unknown,
    ];

    /// Map the portal's numeric filer code. Anything unexpected is `Unknown`.
    pub fn from_code(code: Option<f64>) -> Self {
        match code {
            Some(c) if c == 1.0 => FilerType::Candidate,
            Some(c) if c == 2.0 => FilerType::Committee,
            Some(c) if c == 3.0 => FilerType::Lobbyist,
            _ => FilerType::Unknown,
        }
    }

    /// Classify a raw cell; non-numeric text counts as an unexpected code.
    pub fn from_raw(raw: Option<&str>) -> Self {
        Self::from_code(raw.and_then(|s| s.trim().parse::<f64>().ok()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilerType::Candidate => "candidate",
            FilerType::Committee => "committee",
            FilerType::Lobbyist => "lobbyist",
            FilerType::Unknown => "unknown",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for FilerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
