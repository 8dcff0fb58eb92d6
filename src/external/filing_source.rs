use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::InsiderTransaction;

/// One entry off an EDGAR Form 4 feed, before the underlying filing document
/// has been fetched and parsed into transactions.
#[derive(Debug, Clone)]
pub struct RawFiling {
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub filing_url: String,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum FilingSourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

/// Source of SEC Form 4 filings, abstracting over the ATOM/full-text-search
/// feed and the per-company filing index.
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// List the most recent Form 4 filings for a ticker, newest first.
    async fn list_filings(&self, ticker: &str, limit: u32) -> Result<Vec<RawFiling>, FilingSourceError>;

    /// Fetch and parse a single filing into zero or more transactions.
    /// Malformed entries are skipped rather than failing the whole filing.
    async fn parse_filing(&self, ticker: &str, filing: &RawFiling) -> Result<Vec<InsiderTransaction>, FilingSourceError>;

    /// List accession numbers newly published since `watermark`, newest first,
    /// stopping as soon as `watermark` itself is seen (or the feed is exhausted).
    async fn poll_new_accessions(&self, watermark: Option<&str>) -> Result<Vec<String>, FilingSourceError>;

    /// Fetch and parse Form 4 filings for every ticker in `tickers`, keeping
    /// only transactions dated within `days_back`, rate-limited per ticker.
    async fn batch_fetch(
        &self,
        tickers: &[String],
        days_back: i64,
        filings_per_ticker: u32,
    ) -> Result<Vec<InsiderTransaction>, FilingSourceError>;
}
