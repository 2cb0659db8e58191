// src/extractors/section.rs

// --- Imports ---
use crate::cot::models::MarketSection;
use crate::extractors::tokens::{
    breakdown_from_tokens, counts_from_tokens, find_next, to_number, tokenize, BREAKDOWN_TOKENS,
};
use once_cell::sync::Lazy;
use regex::Regex;

// --- Anchors ---
pub const HEADER_ANCHOR: &str = "Code-";
const FUTURES_ONLY: &str = "FUTURES ONLY POSITIONS";
const OPEN_INTEREST: &str = "OPEN INTEREST";
const COMMITMENTS: &str = "COMMITMENTS";
const CHANGES_FROM: &str = "CHANGES FROM";
const CHANGE_IN_OPEN_INTEREST: &str = "CHANGE IN OPEN INTEREST";
const PERCENT_OF_OPEN_INTEREST: &str = "PERCENT OF OPEN INTEREST";
const NUMBER_OF_TRADERS: &str = "NUMBER OF TRADERS";

// Changes rows are accepted one cell short of a full row.
const CHANGES_MIN_TOKENS: usize = 8;

// --- Regex Patterns (Lazy Static) ---
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+Code-(\S+)").expect("Failed to compile HEADER_RE")
});

static AS_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"AS OF ([0-9]{2}/[0-9]{2}/[0-9]{2})").expect("Failed to compile AS_OF_RE")
});

static CONTRACT_SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((.+?)\)").expect("Failed to compile CONTRACT_SIZE_RE")
});

static OPEN_INTEREST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"OPEN INTEREST:\s*([0-9,]+)").expect("Failed to compile OPEN_INTEREST_RE")
});

static CHANGES_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CHANGES FROM\s+([0-9]{2}/[0-9]{2}/[0-9]{2})").expect("Failed to compile CHANGES_FROM_RE")
});

// Weekly open interest deltas go negative, so a leading minus is accepted.
static CHANGE_IN_OI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CHANGE IN OPEN INTEREST:\s*(-?[0-9,]+)").expect("Failed to compile CHANGE_IN_OI_RE")
});

/// Splits a market header line into `(market name, code)`.
pub fn match_header(line: &str) -> Option<(String, String)> {
    let caps = HEADER_RE.captures(line)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

fn capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn is_separator(line: &str) -> bool {
    line.trim().starts_with('-')
}

/// Walks one market section of a report.
///
/// The section is recognised block by block in the fixed publisher order.
/// Every block is optional: when its anchor cannot be found the field stays
/// `None` and the cursor either stays put or runs to end-of-input.
pub struct SectionExtractor<'a> {
    lines: &'a [&'a str],
    cursor: usize,
    section: MarketSection,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(lines: &'a [&'a str], start: usize) -> Self {
        Self {
            lines,
            cursor: start,
            section: MarketSection::default(),
        }
    }

    /// Runs every block step and returns the section plus the index of the
    /// first line it did not consume.
    pub fn extract(mut self) -> (MarketSection, usize) {
        self.header();
        self.as_of_date();
        self.open_interest();
        self.skip_column_labels();
        self.commitments();
        self.changes();
        self.percent_of_open_interest();
        self.number_of_traders();

        tracing::trace!(
            "Section {:?} ends at line {}",
            self.section.market_name,
            self.cursor
        );
        (self.section, self.cursor)
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.cursor).copied()
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Moves the cursor to the next line containing `anchor`. On exhaustion
    /// the cursor rests at end-of-input and `false` is returned.
    fn seek(&mut self, anchor: &str) -> bool {
        self.seek_by(|line| line.contains(anchor))
    }

    fn seek_by<F: Fn(&str) -> bool>(&mut self, predicate: F) -> bool {
        match find_next(self.lines, self.cursor, predicate) {
            Some(idx) => {
                self.cursor = idx;
                true
            }
            None => {
                self.cursor = self.lines.len();
                false
            }
        }
    }

    /// Consumes the current line and tokenizes the one after it.
    fn next_row(&mut self) -> Vec<&'a str> {
        self.advance();
        self.current().map(tokenize).unwrap_or_default()
    }

    fn header(&mut self) {
        if let Some((name, code)) = self.current().and_then(match_header) {
            tracing::debug!("Found market header: {} ({})", name, code);
            self.section.market_name = Some(name);
            self.section.code = Some(code);
            self.advance();
        }
    }

    fn as_of_date(&mut self) {
        let Some(line) = self.current() else { return };
        if line.contains(FUTURES_ONLY) {
            self.section.as_of_date = capture(&AS_OF_RE, line).map(str::to_string);
            self.advance();
        }
    }

    fn open_interest(&mut self) {
        if !self.seek(OPEN_INTEREST) {
            tracing::debug!("No open interest line for {:?}", self.section.market_name);
            return;
        }
        let line = self.lines[self.cursor];
        self.section.contract_size = capture(&CONTRACT_SIZE_RE, line).map(str::to_string);
        self.section.open_interest =
            capture(&OPEN_INTEREST_RE, line).map(|v| to_number(Some(v)) as i64);
        self.advance();
    }

    fn skip_column_labels(&mut self) {
        while self.current().is_some_and(is_separator) {
            self.advance();
        }
        if self
            .current()
            .is_some_and(|l| l.contains("LONG") && l.contains("SHORT"))
        {
            self.advance();
        }
        while self.current().is_some_and(is_separator) {
            self.advance();
        }
    }

    fn commitments(&mut self) {
        let Some(line) = self.current() else { return };
        if !line.to_uppercase().contains(COMMITMENTS) {
            return;
        }
        let row = self.next_row();
        self.section.commitments = breakdown_from_tokens(&row, BREAKDOWN_TOKENS);
        if self.section.commitments.is_none() {
            tracing::debug!("Commitments row has {} cells, skipping", row.len());
        }
        self.advance();
    }

    fn changes(&mut self) {
        let found = self.seek_by(|l| l.contains(CHANGES_FROM) || l.contains(CHANGE_IN_OPEN_INTEREST));
        if !found {
            return;
        }
        let line = self.lines[self.cursor];
        // A bare "CHANGE IN OPEN INTEREST" line stops the scan but carries no changes block.
        if !line.contains(CHANGES_FROM) {
            return;
        }
        self.section.change_from_date = capture(&CHANGES_FROM_RE, line).map(str::to_string);
        self.section.change_in_open_interest =
            capture(&CHANGE_IN_OI_RE, line).map(|v| to_number(Some(v)) as i64);

        let row = self.next_row();
        if let Some(changes) = breakdown_from_tokens(&row, CHANGES_MIN_TOKENS) {
            if row.len() < BREAKDOWN_TOKENS {
                tracing::debug!(
                    "Changes row for {:?} has {} cells; non-reportable short read as 0",
                    self.section.market_name,
                    row.len()
                );
            }
            self.section.total_change_from_previous_week = Some(changes.total.net());
            self.section.changes = Some(changes);
        }
        self.advance();
    }

    fn percent_of_open_interest(&mut self) {
        if !self.seek(PERCENT_OF_OPEN_INTEREST) {
            return;
        }
        let row = self.next_row();
        self.section.percent_of_open_interest = breakdown_from_tokens(&row, BREAKDOWN_TOKENS);
        self.advance();
    }

    fn number_of_traders(&mut self) {
        if !self.seek(NUMBER_OF_TRADERS) {
            return;
        }
        let row = self.next_row();
        self.section.number_of_traders = counts_from_tokens(&row);
        self.advance();
    }
}

/// Extracts the section starting at `start`. See [`SectionExtractor`].
pub fn extract_section(lines: &[&str], start: usize) -> (MarketSection, usize) {
    SectionExtractor::new(lines, start).extract()
}
