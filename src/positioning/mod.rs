// src/positioning/mod.rs
//! Speculative positioning overview built from a parsed report.
//!
//! Every figure comes from the non-commercial category: contracts held,
//! the week's change, and the long/short split of the two sides.

use crate::cot::models::{MarketSection, ReportDocument};
use serde::Serialize;
use std::fmt::Write;

/// Markets shown when no explicit watch list is given.
pub const DEFAULT_MARKETS: &[&str] = &[
    "BITCOIN - CHICAGO MERCANTILE EXCHANGE",
    "JAPANESE YEN - CHICAGO MERCANTILE EXCHANGE",
    "S&P 500 Consolidated - CHICAGO MERCANTILE EXCHANGE",
    "NZ DOLLAR - CHICAGO MERCANTILE EXCHANGE",
    "NIKKEI STOCK AVERAGE YEN DENOM - CHICAGO MERCANTILE EXCHANGE",
    "AUSTRALIAN DOLLAR - CHICAGO MERCANTILE EXCHANGE",
    "CANADIAN DOLLAR - CHICAGO MERCANTILE EXCHANGE",
    "EURO FX - CHICAGO MERCANTILE EXCHANGE",
    "BRITISH POUND - CHICAGO MERCANTILE EXCHANGE",
    "NASDAQ MINI - CHICAGO MERCANTILE EXCHANGE",
    "RUSSELL E-MINI - CHICAGO MERCANTILE EXCHANGE",
    "SO AFRICAN RAND - CHICAGO MERCANTILE EXCHANGE",
    "SWISS FRANC - CHICAGO MERCANTILE EXCHANGE",
];

/// Watch list of market names. Matching ignores case and surrounding spaces.
#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    markets: Vec<String>,
}

impl MarketFilter {
    /// A filter that keeps every section.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markets: markets
                .into_iter()
                .map(|m| m.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn default_markets() -> Self {
        Self::new(DEFAULT_MARKETS.iter())
    }

    pub fn matches(&self, section: &MarketSection) -> bool {
        if self.markets.is_empty() {
            return true;
        }
        section
            .market_name
            .as_deref()
            .map(|name| name.trim().to_uppercase())
            .is_some_and(|name| self.markets.contains(&name))
    }
}

/// Which side the non-commercials lean to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bias {
    Long,
    Short,
    Flat,
}

impl Bias {
    fn from_net(net_percent: f64) -> Self {
        if net_percent > 0.0 {
            Bias::Long
        } else if net_percent < 0.0 {
            Bias::Short
        } else {
            Bias::Flat
        }
    }

    fn arrow(self) -> &'static str {
        match self {
            Bias::Long => "▲",
            Bias::Short => "▼",
            Bias::Flat => " ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositioningRow {
    pub asset: String,
    pub long: f64,
    pub short: f64,
    pub delta_long: f64,
    pub delta_short: f64,
    pub long_percent: f64,
    pub short_percent: f64,
    pub net_percent: f64,
    pub bias: Bias,
}

impl PositioningRow {
    pub fn from_section(section: &MarketSection) -> Self {
        let (long, short) = section
            .commitments
            .map(|c| (c.non_commercial.long, c.non_commercial.short))
            .unwrap_or((0.0, 0.0));
        let (delta_long, delta_short) = section
            .changes
            .map(|c| (c.non_commercial.long, c.non_commercial.short))
            .unwrap_or((0.0, 0.0));

        let gross = long + short;
        let (long_percent, short_percent, net_percent) = if gross == 0.0 {
            (0.0, 0.0, 0.0)
        } else {
            (
                long / gross * 100.0,
                short / gross * 100.0,
                (long - short) / gross * 100.0,
            )
        };

        Self {
            asset: short_asset_name(section.market_name.as_deref()),
            long,
            short,
            delta_long,
            delta_short,
            long_percent,
            short_percent,
            net_percent,
            bias: Bias::from_net(net_percent),
        }
    }
}

// "EURO FX - CHICAGO MERCANTILE EXCHANGE" -> "EURO FX"
fn short_asset_name(market_name: Option<&str>) -> String {
    market_name
        .and_then(|name| name.split('-').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("N/A")
        .to_string()
}

/// Rows for every section the filter keeps, in report order.
pub fn summarize(report: &ReportDocument, filter: &MarketFilter) -> Vec<PositioningRow> {
    report
        .sections
        .iter()
        .filter(|s| filter.matches(s))
        .map(PositioningRow::from_section)
        .collect()
}

/// 1234567.0 -> "1,234,567"
fn with_separators(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", with_separators(value))
    } else {
        with_separators(value)
    }
}

/// Fixed-width text table of the rows.
pub fn render_table(as_of: Option<&str>, rows: &[PositioningRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Weekly COT Overview  (as of {})", as_of.unwrap_or("N/A"));
    let _ = writeln!(
        out,
        "{:<24} {:>12} {:>12} {:>10} {:>10} {:>8} {:>8} {:>10}",
        "Asset", "Long", "Short", "Δ Long", "Δ Short", "Long %", "Short %", "Net %"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<24} {:>12} {:>12} {:>10} {:>10} {:>7.2}% {:>7.2}% {} {:>7.2}%",
            row.asset,
            with_separators(row.long),
            with_separators(row.short),
            signed(row.delta_long),
            signed(row.delta_short),
            row.long_percent,
            row.short_percent,
            row.bias.arrow(),
            row.net_percent,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cot::models::{TraderBreakdown, TraderGroup};

    fn section(name: Option<&str>, long: f64, short: f64) -> MarketSection {
        MarketSection {
            market_name: name.map(str::to_string),
            commitments: Some(TraderBreakdown {
                non_commercial: TraderGroup::with_spreads(long, short, 0.0),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn percentages_split_the_non_commercial_sides() {
        let row = PositioningRow::from_section(&section(Some("EURO FX - CHICAGO MERCANTILE EXCHANGE"), 75.0, 25.0));
        assert_eq!(row.asset, "EURO FX");
        assert_eq!(row.long_percent, 75.0);
        assert_eq!(row.short_percent, 25.0);
        assert_eq!(row.net_percent, 50.0);
        assert_eq!(row.bias, Bias::Long);
        assert_eq!(row.delta_long, 0.0);
    }

    #[test]
    fn empty_positions_are_flat_not_nan() {
        let row = PositioningRow::from_section(&MarketSection::default());
        assert_eq!(row.asset, "N/A");
        assert_eq!(row.net_percent, 0.0);
        assert_eq!(row.long_percent, 0.0);
        assert_eq!(row.bias, Bias::Flat);
    }

    #[test]
    fn short_bias_and_weekly_deltas() {
        let mut s = section(Some("SWISS FRANC - CHICAGO MERCANTILE EXCHANGE"), 10.0, 30.0);
        s.changes = Some(TraderBreakdown {
            non_commercial: TraderGroup::with_spreads(-5.0, 7.0, 0.0),
            ..Default::default()
        });
        let row = PositioningRow::from_section(&s);
        assert_eq!(row.net_percent, -50.0);
        assert_eq!(row.bias, Bias::Short);
        assert_eq!((row.delta_long, row.delta_short), (-5.0, 7.0));
    }

    #[test]
    fn filter_matches_ignoring_case_and_padding() {
        let mut report = ReportDocument::new();
        report.sections.push(section(Some("  euro fx - chicago mercantile exchange "), 1.0, 1.0));
        report.sections.push(section(Some("WHEAT-SRW - CHICAGO BOARD OF TRADE"), 1.0, 1.0));
        report.sections.push(section(None, 1.0, 1.0));

        let rows = summarize(&report, &MarketFilter::default_markets());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset, "euro fx");

        assert_eq!(summarize(&report, &MarketFilter::all()).len(), 3);
    }

    #[test]
    fn numbers_render_with_separators() {
        assert_eq!(with_separators(1_234_567.0), "1,234,567");
        assert_eq!(with_separators(-4_120.0), "-4,120");
        assert_eq!(with_separators(999.0), "999");
        assert_eq!(signed(2_015.0), "+2,015");
        assert_eq!(signed(0.0), "+0");
    }

    #[test]
    fn table_lists_each_row() {
        let rows = vec![PositioningRow::from_section(&section(Some("BITCOIN - CME"), 17_408.0, 1_973.0))];
        let table = render_table(Some("10/14/25"), &rows);
        assert!(table.starts_with("Weekly COT Overview  (as of 10/14/25)"));
        assert!(table.contains("BITCOIN"));
        assert!(table.contains("17,408"));
        assert!(table.contains("89.82%"));
    }
}
