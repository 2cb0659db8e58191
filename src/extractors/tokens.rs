// src/extractors/tokens.rs
//! Line and cell helpers shared by the section extractor.

use crate::cot::models::{TraderBreakdown, TraderCounts, TraderGroup};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("Failed to compile NUMBER_PREFIX_RE")
});

/// Token positions for one trader category on a data row.
struct Slots {
    long: usize,
    short: usize,
    spreads: Option<usize>,
}

// Column layout of a published data row, left to right:
// non-commercial long/short/spreads, commercial long/short, total long/short,
// non-reportable long/short. The number-of-traders row stops after total.
const NON_COMMERCIAL: Slots = Slots { long: 0, short: 1, spreads: Some(2) };
const COMMERCIAL: Slots = Slots { long: 3, short: 4, spreads: None };
const TOTAL: Slots = Slots { long: 5, short: 6, spreads: None };
const NON_REPORTABLE: Slots = Slots { long: 7, short: 8, spreads: None };

/// Tokens needed for a full four-category row.
pub const BREAKDOWN_TOKENS: usize = 9;
/// Tokens needed for a number-of-traders row.
pub const COUNTS_TOKENS: usize = 7;

/// Index of the first line at or after `from` satisfying `predicate`.
/// `None` once the input is exhausted.
pub fn find_next<F>(lines: &[&str], from: usize, predicate: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| predicate(**line))
        .map(|(idx, _)| idx)
}

/// Splits a fixed-width data row into its whitespace-separated cells.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Lenient numeric coercion: thousands separators are dropped, the longest
/// leading number is kept (`"31.5%"` reads as 31.5) and a cell with no
/// leading number counts as zero.
pub fn to_number(token: Option<&str>) -> f64 {
    token
        .map(|t| t.replace(',', ""))
        .and_then(|t| {
            NUMBER_PREFIX_RE
                .find(t.trim())
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn group(tokens: &[&str], slots: &Slots) -> TraderGroup {
    let cell = |idx: usize| to_number(tokens.get(idx).copied());
    match slots.spreads {
        Some(spreads) => TraderGroup::with_spreads(cell(slots.long), cell(slots.short), cell(spreads)),
        None => TraderGroup::new(cell(slots.long), cell(slots.short)),
    }
}

/// Maps a data row onto the four trader categories. Returns `None` when the
/// row has fewer than `min_tokens` cells; slots past the end of a shorter
/// row read as zero.
pub fn breakdown_from_tokens(tokens: &[&str], min_tokens: usize) -> Option<TraderBreakdown> {
    if tokens.len() < min_tokens {
        return None;
    }
    Some(TraderBreakdown {
        non_commercial: group(tokens, &NON_COMMERCIAL),
        commercial: group(tokens, &COMMERCIAL),
        total: group(tokens, &TOTAL),
        non_reportable: group(tokens, &NON_REPORTABLE),
    })
}

/// Maps a number-of-traders row onto its three categories.
pub fn counts_from_tokens(tokens: &[&str]) -> Option<TraderCounts> {
    if tokens.len() < COUNTS_TOKENS {
        return None;
    }
    Some(TraderCounts {
        non_commercial: group(tokens, &NON_COMMERCIAL),
        commercial: group(tokens, &COMMERCIAL),
        total: group(tokens, &TOTAL),
    })
}
