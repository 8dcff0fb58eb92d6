//! Filters insider signals down to actionable alerts and persists them.
//!
//! Transliterated from `original_source/src/services/alert_service.py`. This
//! system's alerting is a flat score threshold, not the teacher's
//! cooldown/rule-config model (spec's `Alert` has no cooldown field).

use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::models::{InsiderAlert, InsiderSignal};
use crate::store::TransactionStore;

pub struct AlertService {
    store: Arc<dyn TransactionStore>,
    threshold: f64,
}

impl AlertService {
    pub fn new(store: Arc<dyn TransactionStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    /// Persists an alert for every signal at or above the anomaly threshold,
    /// returning the subset that was actionable.
    pub async fn evaluate(&self, signals: Vec<InsiderSignal>) -> Result<Vec<InsiderSignal>, AppError> {
        let total = signals.len();
        let mut actionable = Vec::new();

        for signal in signals {
            if signal.anomaly_score < self.threshold {
                continue;
            }

            self.store
                .save_alert(
                    &signal.ticker,
                    signal.anomaly_score,
                    signal.insider_sentiment.as_str(),
                    &signal.recommendation,
                    signal.composite_alpha_score,
                )
                .await?;

            actionable.push(signal);
        }

        info!(total, actionable = actionable.len(), threshold = self.threshold, "alert evaluation complete");
        Ok(actionable)
    }

    pub async fn get_active_alerts(&self, limit: i64) -> Result<Vec<InsiderAlert>, AppError> {
        self.store.get_alerts(Some(false), limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InsiderAlert, InsiderAnomaly, InsiderTransaction};
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        saved: Mutex<Vec<(String, f64)>>,
    }

    #[async_trait]
    impl TransactionStore for FakeStore {
        async fn upsert_transactions(&self, _txns: &[InsiderTransaction]) -> Result<u64, AppError> {
            Ok(0)
        }
        async fn get_transactions(&self, _ticker: &str, _days_back: i64, _insider_name: Option<&str>) -> Result<Vec<InsiderTransaction>, AppError> {
            Ok(vec![])
        }
        async fn get_recent_sellers(&self, _ticker: &str, _window_days: i64) -> Result<Vec<String>, AppError> {
            Ok(vec![])
        }
        async fn get_profile(&self, _ticker: &str, _insider_name: &str) -> Result<Option<crate::models::InsiderProfile>, AppError> {
            Ok(None)
        }
        async fn save_anomaly(&self, _anomaly: &InsiderAnomaly) -> Result<i64, AppError> {
            Ok(1)
        }
        async fn get_anomalies(&self, _ticker: Option<&str>, _min_score: f64, _limit: i64) -> Result<Vec<InsiderAnomaly>, AppError> {
            Ok(vec![])
        }
        async fn save_alert(&self, ticker: &str, anomaly_score: f64, _insider_sentiment: &str, _recommendation: &str, _composite_alpha_score: Option<f64>) -> Result<i64, AppError> {
            self.saved.lock().await.push((ticker.to_string(), anomaly_score));
            Ok(1)
        }
        async fn get_alerts(&self, _delivered: Option<bool>, _limit: i64) -> Result<Vec<InsiderAlert>, AppError> {
            Ok(vec![])
        }
        async fn get_watermark(&self, _feed_name: &str) -> Result<Option<String>, AppError> {
            Ok(None)
        }
        async fn set_watermark(&self, _feed_name: &str, _accession: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn signal(ticker: &str, score: f64) -> InsiderSignal {
        InsiderSignal { analysis_date: Utc::now(), ..InsiderSignal::empty(ticker) }.with_score(score)
    }

    impl InsiderSignal {
        fn with_score(mut self, score: f64) -> Self {
            self.anomaly_score = score;
            self
        }
    }

    #[tokio::test]
    async fn filters_below_threshold_and_persists_the_rest() {
        let store = Arc::new(FakeStore::default());
        let service = AlertService::new(store.clone(), 0.5);

        let actionable = service
            .evaluate(vec![signal("LOW", 0.2), signal("HIGH", 0.9)])
            .await
            .unwrap();

        assert_eq!(actionable.len(), 1);
        assert_eq!(actionable[0].ticker, "HIGH");
        assert_eq!(store.saved.lock().await.len(), 1);
    }
}
