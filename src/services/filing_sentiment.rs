//! Bridge to an external 10-K/10-Q filing-sentiment pipeline.
//!
//! That retrieval pipeline is out of scope here, so this only defines the
//! seam: [`FilingSentimentProvider`] lets [`crate::services::composite_engine::CompositeEngine`]
//! blend in a filing-drift score when one is available, and tolerates its
//! total absence via [`NoopFilingSentimentProvider`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A filing-sentiment signal for one ticker, as produced by the (external)
/// filing-drift analysis this system composes with but does not implement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingSentiment {
    pub signal_score: f64,
    pub confidence: f64,
    pub summary: String,
}

#[async_trait]
pub trait FilingSentimentProvider: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Option<FilingSentiment>;
}

/// Default provider: the filing-drift pipeline is not wired up, so the
/// composite engine always falls back to insider-only scoring.
pub struct NoopFilingSentimentProvider;

#[async_trait]
impl FilingSentimentProvider for NoopFilingSentimentProvider {
    async fn fetch(&self, _ticker: &str) -> Option<FilingSentiment> {
        None
    }
}
