// src/cot/client.rs
use crate::utils::error::FetchError;
use once_cell::sync::Lazy;
use reqwest::header;
use scraper::{Html, Selector};
use std::time::Duration;

const COT_USER_AGENT: &str = concat!("cot_extractor/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

// The publisher wraps the fixed-width text in <pre> on its HTML pages.
static PRE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("pre").expect("Failed to compile PRE_SELECTOR")
});

/// Creates a reqwest client configured for report downloads.
fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(COT_USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
}

/// Downloads a report and returns its plain text.
pub async fn download_report(url: &str) -> Result<String, FetchError> {
    let client = build_client()?;

    tracing::info!("Downloading COT report from: {}", url);

    let response = client.get(url)
        .header(header::ACCEPT, "text/plain,text/html,*/*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        return Err(FetchError::Http(status));
    }

    let body = response.text().await?;
    tracing::debug!("Downloaded {} bytes from {}", body.len(), url);

    let text = report_text(&body);
    if text.trim().is_empty() {
        return Err(FetchError::EmptyBody(url.to_string()));
    }
    Ok(text)
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(512).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<pre")
}

/// Unwraps the report from an HTML page, or passes plain text through.
pub fn report_text(body: &str) -> String {
    if !looks_like_html(body) {
        return body.to_string();
    }

    let document = Html::parse_document(body);
    let blocks: Vec<String> = document
        .select(&PRE_SELECTOR)
        .map(|pre| pre.text().collect::<String>())
        .collect();

    if blocks.is_empty() {
        tracing::warn!("HTML page has no <pre> block; using the raw body");
        return body.to_string();
    }
    tracing::debug!("Extracted {} <pre> block(s) from HTML page", blocks.len());
    blocks.join("\n")
}
