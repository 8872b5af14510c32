//! Display-only classification of the weekly-hours field.
//!
//! The rule looks at the first run of decimal digits in the free-text
//! hours value. Weekly hours of 16 or less, or 35 or more, are flagged as
//! not applicable. The annotation never changes the stored record.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hours at or below this are flagged.
const LOW_HOURS_LIMIT: u64 = 16;
/// Hours at or above this are flagged.
const HIGH_HOURS_LIMIT: u64 = 35;

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Annotation attached to a row when rendering or exporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Annotation {
    NotApplicable,
}

impl Annotation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NotApplicable => "NOT APPLICABLE",
        }
    }
}

/// Classify a weekly-hours value.
///
/// Only the first number counts, so `"35-40 horas/sem"` is read as 35.
/// A digit run too long for `u64` is treated as a very large value.
pub(crate) fn annotate(weekly_hours: &str) -> Option<Annotation> {
    let digits = FIRST_NUMBER.find(weekly_hours)?.as_str();
    let hours = digits.parse::<u64>().unwrap_or(u64::MAX);
    if hours >= HIGH_HOURS_LIMIT || hours <= LOW_HOURS_LIMIT {
        Some(Annotation::NotApplicable)
    } else {
        None
    }
}

/// The annotation text for a row, or an empty string.
pub(crate) fn annotation_text(weekly_hours: &str) -> &'static str {
    annotate(weekly_hours).map_or("", Annotation::as_str)
}
