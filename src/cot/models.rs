// src/cot/models.rs
use serde::{Deserialize, Serialize};

/// Label stamped on every parsed document; only one layout family is understood.
pub const REPORT_TYPE: &str = "Disaggregated COT";

/// A whole parsed report: one entry per market section, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub report_type: String,
    pub sections: Vec<MarketSection>,
}

impl ReportDocument {
    pub fn new() -> Self {
        Self {
            report_type: REPORT_TYPE.to_string(),
            sections: Vec::new(),
        }
    }

    /// As-of date of the first section that carries one.
    pub fn as_of_date(&self) -> Option<&str> {
        self.sections.iter().find_map(|s| s.as_of_date.as_deref())
    }
}

impl Default for ReportDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// One market's disclosure. Every field is absent until its block is found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<String>, // MM/DD/YY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_in_open_interest: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_change_from_previous_week: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitments: Option<TraderBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<TraderBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_from_date: Option<String>, // MM/DD/YY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_of_open_interest: Option<TraderBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_traders: Option<TraderCounts>,
}

/// Long/short (and, for non-commercials, spreads) figures for one trader category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraderGroup {
    pub long: f64,
    pub short: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreads: Option<f64>,
}

impl TraderGroup {
    pub fn new(long: f64, short: f64) -> Self {
        Self { long, short, spreads: None }
    }

    pub fn with_spreads(long: f64, short: f64, spreads: f64) -> Self {
        Self { long, short, spreads: Some(spreads) }
    }

    /// Long minus short.
    pub fn net(&self) -> f64 {
        self.long - self.short
    }
}

/// Four-category breakdown used by the commitments, changes and percent blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderBreakdown {
    pub non_commercial: TraderGroup,
    pub commercial: TraderGroup,
    pub total: TraderGroup,
    pub non_reportable: TraderGroup,
}

/// Reduced breakdown of the number-of-traders block. There is no
/// non-reportable column here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderCounts {
    pub non_commercial: TraderGroup,
    pub commercial: TraderGroup,
    pub total: TraderGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let section = MarketSection {
            market_name: Some("WIDGET FUTURES".to_string()),
            code: Some("001".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&section).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["marketName"], "WIDGET FUTURES");
        assert_eq!(obj["code"], "001");
    }

    #[test]
    fn spreads_only_serialized_when_present() {
        let breakdown = TraderBreakdown {
            non_commercial: TraderGroup::with_spreads(10.0, 5.0, 2.0),
            commercial: TraderGroup::new(20.0, 15.0),
            total: TraderGroup::new(30.0, 20.0),
            non_reportable: TraderGroup::new(5.0, 5.0),
        };
        let json = serde_json::to_value(breakdown).unwrap();
        assert_eq!(json["nonCommercial"]["spreads"], 2.0);
        assert!(json["commercial"].get("spreads").is_none());
        assert!(json.get("nonReportable").is_some());
    }

    #[test]
    fn document_reads_back_from_stored_json() {
        let raw = r#"{
            "reportType": "Disaggregated COT",
            "sections": [
                { "marketName": "EURO FX - CHICAGO MERCANTILE EXCHANGE", "code": "099741", "openInterest": 700000 }
            ]
        }"#;
        let doc: ReportDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.report_type, REPORT_TYPE);
        assert_eq!(doc.sections[0].open_interest, Some(700000));
        assert!(doc.sections[0].commitments.is_none());
    }
}
