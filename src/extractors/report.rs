// src/extractors/report.rs
use crate::cot::models::ReportDocument;
use crate::extractors::section::{extract_section, match_header, HEADER_ANCHOR};

/// Parses the full text of a report into one section per market header.
///
/// Never fails: blocks that cannot be located are left out of their section.
pub fn parse_report(text: &str) -> ReportDocument {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut report = ReportDocument::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        // Stray "Code-" text that is not shaped like a header is skipped.
        if line.contains(HEADER_ANCHOR) && match_header(line).is_some() {
            let (section, next) = extract_section(&lines, i);
            report.sections.push(section);
            i = next.max(i + 1);
        } else {
            i += 1;
        }
    }

    tracing::debug!(
        "Parsed {} market sections from {} lines",
        report.sections.len(),
        lines.len()
    );
    report
}
