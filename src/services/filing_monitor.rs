//! Dual-path ingestion monitor for Form 4 filings.
//!
//! Path A polls the SEC EDGAR full-text-search ATOM feed for near-real-time
//! detection. Path B runs a scheduled batch sweep over the whole universe as
//! a safety net with an overlapping lookback window. Transliterated from
//! `original_source/src/services/filing_monitor.py`.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::RwLock;

use chrono::{Local, NaiveTime};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::external::FilingSource;
use crate::store::TransactionStore;

const FEED_NAME: &str = "form4_atom";

pub struct FilingMonitorConfig {
    pub atom_poll_interval_market: Duration,
    pub atom_poll_interval_off: Duration,
    pub batch_interval: Duration,
    pub batch_overlap_hours: i64,
    pub filings_per_ticker: u32,
}

/// Dual-path monitor: owns the two background tasks and their lifecycle.
pub struct FilingMonitor {
    store: Arc<dyn TransactionStore>,
    source: Arc<dyn FilingSource>,
    universe: Arc<RwLock<HashSet<String>>>,
    config: FilingMonitorConfig,
    tasks: Vec<JoinHandle<()>>,
}

impl FilingMonitor {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        source: Arc<dyn FilingSource>,
        universe: Vec<String>,
        config: FilingMonitorConfig,
    ) -> Self {
        let universe = universe.into_iter().map(|t| t.to_uppercase()).collect();
        Self { store, source, universe: Arc::new(RwLock::new(universe)), config, tasks: Vec::new() }
    }

    pub fn universe_size(&self) -> usize {
        self.universe.read().unwrap().len()
    }

    /// Launches both the ATOM poller and the batch scheduler as background tasks.
    pub fn start(&mut self) {
        let atom_store = self.store.clone();
        let atom_source = self.source.clone();
        let atom_market_interval = self.config.atom_poll_interval_market;
        let atom_off_interval = self.config.atom_poll_interval_off;
        self.tasks.push(tokio::spawn(async move {
            Self::atom_poll_loop(atom_store, atom_source, atom_market_interval, atom_off_interval).await;
        }));

        let batch_store = self.store.clone();
        let batch_source = self.source.clone();
        let batch_universe = self.universe.clone();
        let batch_interval = self.config.batch_interval;
        let overlap_days = (self.config.batch_overlap_hours / 24 + 1).max(1);
        let filings_per_ticker = self.config.filings_per_ticker;
        self.tasks.push(tokio::spawn(async move {
            Self::batch_sweep_loop(batch_store, batch_source, batch_universe, batch_interval, overlap_days, filings_per_ticker)
                .await;
        }));

        info!(universe_size = self.universe_size(), "filing monitor started");
    }

    /// Aborts both background tasks and waits for them to unwind.
    pub async fn stop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = %e, "filing monitor task panicked");
                }
            }
        }
        info!("filing monitor stopped");
    }

    // ------------------------------------------------------------------
    // Path A: ATOM feed poller
    // ------------------------------------------------------------------

    async fn atom_poll_loop(
        store: Arc<dyn TransactionStore>,
        source: Arc<dyn FilingSource>,
        market_interval: Duration,
        off_interval: Duration,
    ) {
        loop {
            if let Err(e) = Self::poll_atom_feed(&store, &source).await {
                error!(error = %e, "ATOM poll error");
            }
            sleep(Self::current_poll_interval(market_interval, off_interval)).await;
        }
    }

    async fn poll_atom_feed(store: &Arc<dyn TransactionStore>, source: &Arc<dyn FilingSource>) -> Result<(), crate::errors::AppError> {
        let watermark = store.get_watermark(FEED_NAME).await?;
        let new_accessions = source.poll_new_accessions(watermark.as_deref()).await.map_err(|e| crate::errors::AppError::External(e.to_string()))?;

        if new_accessions.is_empty() {
            return Ok(());
        }

        info!(count = new_accessions.len(), "ATOM feed: new Form 4 entries");

        let latest = new_accessions[0].clone();
        for accession in &new_accessions {
            Self::process_accession(accession);
        }

        store.set_watermark(FEED_NAME, &latest).await?;
        Ok(())
    }

    /// Resolving an accession number to a ticker requires fetching the
    /// filing itself; the batch sweep is the source of full coverage, so
    /// this path only tracks the watermark for liveness.
    fn process_accession(accession: &str) {
        let _ = accession;
    }

    fn current_poll_interval(market_interval: Duration, off_interval: Duration) -> Duration {
        let now = Local::now().time();
        let market_open = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let market_close = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        if now >= market_open && now <= market_close {
            market_interval
        } else {
            off_interval
        }
    }

    // ------------------------------------------------------------------
    // Path B: scheduled batch sweep
    // ------------------------------------------------------------------

    async fn batch_sweep_loop(
        store: Arc<dyn TransactionStore>,
        source: Arc<dyn FilingSource>,
        universe: Arc<RwLock<HashSet<String>>>,
        interval: Duration,
        overlap_days: i64,
        filings_per_ticker: u32,
    ) {
        loop {
            if let Err(e) = Self::run_batch_sweep(&store, &source, &universe, overlap_days, filings_per_ticker).await {
                error!(error = %e, "batch sweep error");
            }
            sleep(interval).await;
        }
    }

    async fn run_batch_sweep(
        store: &Arc<dyn TransactionStore>,
        source: &Arc<dyn FilingSource>,
        universe: &Arc<RwLock<HashSet<String>>>,
        overlap_days: i64,
        filings_per_ticker: u32,
    ) -> Result<(), crate::errors::AppError> {
        let mut tickers: Vec<String> = universe.read().unwrap().iter().cloned().collect();
        tickers.sort();

        info!(tickers = tickers.len(), overlap_days, "starting batch sweep");

        let txns = source
            .batch_fetch(&tickers, overlap_days, filings_per_ticker)
            .await
            .map_err(|e| crate::errors::AppError::External(e.to_string()))?;
        let fetched = txns.len();
        let inserted = store.upsert_transactions(&txns).await?;

        info!(new_transactions = inserted, total_fetched = fetched, "batch sweep complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_one_of_the_two_configured_durations() {
        let market = Duration::from_secs(300);
        let off = Duration::from_secs(1800);
        let interval = FilingMonitor::current_poll_interval(market, off);
        assert!(interval == market || interval == off);
    }
}
