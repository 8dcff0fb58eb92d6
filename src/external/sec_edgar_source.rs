use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use reqwest::Client;
use std::str::FromStr;
use tracing::{info, warn};

use crate::external::filing_source::{FilingSource, FilingSourceError, RawFiling};
use crate::models::{InsiderTransaction, TransactionCode};
use crate::services::rate_limiter::RateLimiter;

/// SEC EDGAR-backed [`FilingSource`]. Fetches the per-company Form 4 filing
/// index (for batch sweeps) and the EDGAR full-text-search ATOM feed (for the
/// near-real-time poller), extracting fields via targeted regexes the same
/// way the rest of this codebase scrapes EDGAR's Atom/XML responses (no full
/// XML parser, since the fields we need are a handful of flat tags).
pub struct SecEdgarFilingSource {
    client: Client,
    user_agent: String,
    rate_limiter: RateLimiter,
}

const ATOM_ENTRY_RE: &str = r"(?s)<entry>(.*?)</entry>";

impl SecEdgarFilingSource {
    pub fn new(user_agent: impl Into<String>, requests_per_second: u32) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build SEC EDGAR HTTP client"),
            user_agent: user_agent.into(),
            rate_limiter: RateLimiter::new(3, requests_per_second),
        }
    }

    async fn get(&self, url: &str) -> Result<String, FilingSourceError> {
        let _permit = self.rate_limiter.acquire().await;

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| FilingSourceError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FilingSourceError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(FilingSourceError::BadResponse(response.status().to_string()));
        }

        response.text().await.map_err(|e| FilingSourceError::Network(e.to_string()))
    }

    fn extract_tag(xml: &str, tag: &str) -> Option<String> {
        let pattern = format!(r"<{}[^>]*>(.*?)</{}>", tag, tag);
        let re = Regex::new(&pattern).ok()?;
        re.captures(xml).and_then(|cap| cap.get(1)).map(|m| m.as_str().trim().to_string())
    }

    fn extract_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
        let pattern = format!(r#"<{}\s[^>]*{}="([^"]+)"#, tag, attr);
        let re = Regex::new(&pattern).ok()?;
        re.captures(xml).and_then(|cap| cap.get(1)).map(|m| m.as_str().to_string())
    }

    fn extract_accession_from_url(url: &str) -> String {
        let re = Regex::new(r"accession_number=([0-9-]+)").unwrap();
        re.captures(url)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| {
                // full-text-search ATOM ids embed the accession in the final path segment
                url.rsplit('/').next().unwrap_or("unknown").trim_end_matches(".xml").to_string()
            })
    }

    fn parse_index_entries(body: &str, ticker: &str) -> Vec<RawFiling> {
        let entry_re = Regex::new(ATOM_ENTRY_RE).unwrap();
        let mut filings = Vec::new();

        for cap in entry_re.captures_iter(body) {
            let entry = &cap[1];
            let title = Self::extract_tag(entry, "title").unwrap_or_default();
            let link = Self::extract_attribute(entry, "link", "href").unwrap_or_default();
            let filing_date_str = Self::extract_tag(entry, "filing-date").unwrap_or_default();

            let Some(filing_date) = NaiveDate::parse_from_str(&filing_date_str, "%Y-%m-%d").ok() else {
                continue;
            };

            filings.push(RawFiling {
                accession_number: Self::extract_accession_from_url(&link),
                filing_date,
                filing_url: link,
                title: if title.is_empty() { format!("4 - {}", ticker) } else { title },
            });
        }

        filings
    }

    fn nondiv_transaction_block_re() -> Regex {
        Regex::new(r"(?s)<nonDerivativeTransaction>(.*?)</nonDerivativeTransaction>").unwrap()
    }

    fn reporting_owner_fields(xml: &str) -> (String, String, bool, bool) {
        let name = Self::extract_tag(xml, "rptOwnerName").unwrap_or_default();
        let title = Self::extract_tag(xml, "officerTitle").unwrap_or_default();
        let is_officer = Self::extract_tag(xml, "isOfficer").map(|v| v.trim() == "1").unwrap_or(false);
        let is_director = Self::extract_tag(xml, "isDirector").map(|v| v.trim() == "1").unwrap_or(false);
        (name, title, is_officer, is_director)
    }

    /// Parse a Form 4 primary document's transactions out of its raw submission text.
    fn parse_form4_document(
        ticker: &str,
        body: &str,
        filing_date: NaiveDate,
    ) -> Vec<InsiderTransaction> {
        let (owner_name, owner_title, is_officer, is_director) = Self::reporting_owner_fields(body);
        let is_10b5_1 = Self::extract_tag(body, "aff10b5One").map(|v| v.trim() == "1").unwrap_or(false);

        let mut transactions = Vec::new();
        for cap in Self::nondiv_transaction_block_re().captures_iter(body) {
            let block = &cap[1];

            let tx_date = Self::extract_tag(block, "value")
                .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
                .unwrap_or(filing_date);

            let code = Self::extract_tag(block, "transactionCode").unwrap_or_else(|| "O".to_string());

            // `<value>` appears multiple times per block (date, code context, shares,
            // price, post-transaction shares); scope each lookup to its own sub-tag.
            let shares = Self::extract_scoped_value(block, "transactionShares");
            let price = Self::extract_scoped_value(block, "transactionPricePerShare");
            let owned_after = Self::extract_scoped_value(block, "sharesOwnedFollowingTransaction");

            let Some(shares) = shares else {
                warn!(ticker, "skipping Form 4 transaction with no share count");
                continue;
            };

            match InsiderTransaction::new(
                ticker.to_string(),
                owner_name.clone(),
                owner_title.clone(),
                is_officer,
                is_director,
                tx_date,
                TransactionCode::from_raw(&code),
                shares,
                price,
                owned_after,
                is_10b5_1,
                filing_date,
            ) {
                Ok(tx) => transactions.push(tx),
                Err(e) => warn!(ticker, error = %e, "skipping malformed Form 4 transaction"),
            }
        }

        transactions
    }

    fn extract_scoped_value(xml: &str, tag: &str) -> Option<BigDecimal> {
        let pattern = format!(r"(?s)<{}>.*?<value>([^<]+)</value>", tag);
        let re = Regex::new(&pattern).ok()?;
        re.captures(xml)
            .and_then(|cap| cap.get(1))
            .and_then(|m| BigDecimal::from_str(m.as_str().trim()).ok())
    }

    fn submission_text_url(index_url: &str) -> String {
        if index_url.contains("-index.htm") {
            index_url.replace("-index.htm", ".txt")
        } else {
            index_url.to_string()
        }
    }
}

#[async_trait]
impl FilingSource for SecEdgarFilingSource {
    async fn list_filings(&self, ticker: &str, limit: u32) -> Result<Vec<RawFiling>, FilingSourceError> {
        let url = format!(
            "https://www.sec.gov/cgi-bin/browse-edgar?action=getcompany&CIK={}&type=4&count={}&output=atom",
            ticker.to_uppercase(),
            limit
        );
        let body = self.get(&url).await?;
        Ok(Self::parse_index_entries(&body, ticker))
    }

    async fn parse_filing(&self, ticker: &str, filing: &RawFiling) -> Result<Vec<InsiderTransaction>, FilingSourceError> {
        tracing::debug!(ticker, title = %filing.title, "parsing filing");
        let url = Self::submission_text_url(&filing.filing_url);
        let body = self.get(&url).await?;
        if !body.contains("ownershipDocument") {
            return Err(FilingSourceError::Parse(format!("{} did not contain a Form 4 ownership document", url)));
        }
        Ok(Self::parse_form4_document(ticker, &body, filing.filing_date))
    }

    async fn poll_new_accessions(&self, watermark: Option<&str>) -> Result<Vec<String>, FilingSourceError> {
        let today = Utc::now().date_naive();
        let url = format!(
            "https://efts.sec.gov/LATEST/search-index?q=%224%22&dateRange=custom&startdt={}&enddt={}&forms=4",
            today, today
        );
        let body = self.get(&url).await?;

        let entry_re = Regex::new(ATOM_ENTRY_RE).unwrap();
        let mut accessions = Vec::new();
        for cap in entry_re.captures_iter(&body) {
            let entry = &cap[1];
            let Some(id) = Self::extract_tag(entry, "id") else { continue };
            if Some(id.as_str()) == watermark {
                break;
            }
            accessions.push(id);
        }

        Ok(accessions)
    }

    async fn batch_fetch(
        &self,
        tickers: &[String],
        days_back: i64,
        filings_per_ticker: u32,
    ) -> Result<Vec<InsiderTransaction>, FilingSourceError> {
        let cutoff = Utc::now().date_naive() - Duration::days(days_back);
        let mut all_txns = Vec::new();

        for ticker in tickers {
            let filings = match self.list_filings(ticker, filings_per_ticker).await {
                Ok(f) => f,
                Err(e) => {
                    warn!(ticker, error = %e, "failed to list Form 4 filings");
                    continue;
                }
            };

            for filing in &filings {
                if filing.filing_date < cutoff {
                    continue;
                }
                match self.parse_filing(ticker, filing).await {
                    Ok(txns) => all_txns.extend(txns.into_iter().filter(|t| t.transaction_date >= cutoff)),
                    Err(e) => warn!(ticker, accession = %filing.accession_number, error = %e, "failed to parse filing"),
                }
            }
        }

        info!(tickers = tickers.len(), transactions = all_txns.len(), "batch fetch complete");
        Ok(all_txns)
    }
}
