//! String format detection over profile examples.
//!
//! Detection is deterministic: fixed parsers, fixed candidate order,
//! and a confidence vote over the example reservoir. A format is only
//! assigned when enough examples exist and a qualifying fraction of
//! them parse.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Formats the schema can hint at, spelled as JSON Schema spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatHint {
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "date-time")]
    DateTime,
    #[serde(rename = "ipv4")]
    Ipv4,
    #[serde(rename = "ipv6")]
    Ipv6,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "uri")]
    Uri,
}

impl FormatHint {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FormatHint::Date => "date",
            FormatHint::DateTime => "date-time",
            FormatHint::Ipv4 => "ipv4",
            FormatHint::Ipv6 => "ipv6",
            FormatHint::Email => "email",
            FormatHint::Uri => "uri",
        }
    }

    fn matches(&self, s: &str) -> bool {
        match self {
            FormatHint::Date => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }
            FormatHint::DateTime => DateTime::parse_from_rfc3339(s).is_ok(),
            FormatHint::Ipv4 => s.parse::<Ipv4Addr>().is_ok(),
            FormatHint::Ipv6 => s.parse::<Ipv6Addr>().is_ok(),
            FormatHint::Email => EMAIL_RE.is_match(s),
            FormatHint::Uri => Url::parse(s).is_ok(),
        }
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email regex compiles")
});

/// Candidate order matters: narrower formats first, so a column of
/// dates never reports `uri`.
const CANDIDATES: [FormatHint; 6] = [
    FormatHint::Date,
    FormatHint::DateTime,
    FormatHint::Ipv4,
    FormatHint::Ipv6,
    FormatHint::Email,
    FormatHint::Uri,
];

/// Vote over string examples. Returns the first candidate whose match
/// fraction reaches `confidence`, or `None` when fewer than
/// `min_examples` examples exist or nothing qualifies.
pub fn detect_format(
    examples: &[&str],
    confidence: f64,
    min_examples: usize,
) -> Option<FormatHint> {
    if examples.len() < min_examples {
        return None;
    }
    let total = examples.len() as f64;
    for candidate in CANDIDATES {
        let hits =
            examples.iter().filter(|s| candidate.matches(s)).count() as f64;
        if hits / total >= confidence {
            return Some(candidate);
        }
    }
    None
}
