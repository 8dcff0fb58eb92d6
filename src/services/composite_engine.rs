//! Merges the insider-trading signal with an (optional) filing-sentiment
//! score into a single composite alpha score and recommendation.
//!
//! Transliterated from `original_source/src/agents/composite_signal.py`.

use std::sync::Arc;

use tracing::info;

use crate::models::InsiderSignal;
use crate::services::filing_sentiment::FilingSentimentProvider;
use crate::services::narrator::Narrator;

pub struct CompositeEngine {
    filing_sentiment: Arc<dyn FilingSentimentProvider>,
    narrator: Arc<dyn Narrator>,
}

impl CompositeEngine {
    pub fn new(filing_sentiment: Arc<dyn FilingSentimentProvider>, narrator: Arc<dyn Narrator>) -> Self {
        Self { filing_sentiment, narrator }
    }

    /// Combines filing analysis and the insider signal into an enriched
    /// `InsiderSignal` carrying `composite_alpha_score` and `recommendation`.
    pub async fn compose(&self, ticker: &str, mut signal: InsiderSignal) -> InsiderSignal {
        let filing = self.filing_sentiment.fetch(ticker).await;
        let filing_score = filing.as_ref().map(|f| f.signal_score).unwrap_or(0.0);
        let insider_score = signal.anomaly_score;

        let composite = Self::blend_scores(filing_score, insider_score);
        signal.composite_alpha_score = Some(composite);

        let recommendation = self.narrator.narrate(ticker, filing.as_ref(), &signal, composite).await;
        signal.recommendation = recommendation;

        info!(ticker, composite, "composed signal");
        signal
    }

    /// Weighted blend with a conviction boost when both signals agree and are strong.
    fn blend_scores(filing_score: f64, insider_score: f64) -> f64 {
        let mut blended = 0.5 * filing_score + 0.5 * insider_score;
        if filing_score > 0.5 && insider_score > 0.5 {
            blended = (blended * 1.2).min(1.0);
        }
        (blended * 10_000.0).round() / 10_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_is_simple_average_when_signals_disagree() {
        assert_eq!(CompositeEngine::blend_scores(0.2, 0.3), 0.25);
    }

    #[test]
    fn blend_gets_conviction_boost_when_both_strong() {
        let blended = CompositeEngine::blend_scores(0.8, 0.8);
        assert_eq!(blended, 0.96);
    }

    #[test]
    fn blend_boost_clamps_at_one() {
        let blended = CompositeEngine::blend_scores(0.95, 0.95);
        assert_eq!(blended, 1.0);
    }
}
