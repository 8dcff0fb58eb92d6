pub mod alert_queries;
pub mod anomaly_queries;
pub mod transaction_queries;
pub mod watermark_queries;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::{InsiderAlert, InsiderAnomaly, InsiderProfile, InsiderTransaction};

/// Persistence boundary for insider transactions, derived profiles, anomalies,
/// alerts, and feed watermarks.
///
/// Generalizes the teacher's per-table `db/*.rs` free functions into a single
/// trait so [`crate::services::anomaly_engine::AnomalyEngine`] and
/// [`crate::services::alert_service::AlertService`] can be exercised against
/// an in-memory fake without a live database.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn upsert_transactions(&self, txns: &[InsiderTransaction]) -> Result<u64, AppError>;

    async fn get_transactions(
        &self,
        ticker: &str,
        days_back: i64,
        insider_name: Option<&str>,
    ) -> Result<Vec<InsiderTransaction>, AppError>;

    async fn get_recent_sellers(&self, ticker: &str, window_days: i64) -> Result<Vec<String>, AppError>;

    async fn get_profile(&self, ticker: &str, insider_name: &str) -> Result<Option<InsiderProfile>, AppError>;

    async fn save_anomaly(&self, anomaly: &InsiderAnomaly) -> Result<i64, AppError>;

    async fn get_anomalies(
        &self,
        ticker: Option<&str>,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<InsiderAnomaly>, AppError>;

    #[allow(clippy::too_many_arguments)]
    async fn save_alert(
        &self,
        ticker: &str,
        anomaly_score: f64,
        insider_sentiment: &str,
        recommendation: &str,
        composite_alpha_score: Option<f64>,
    ) -> Result<i64, AppError>;

    async fn get_alerts(&self, delivered: Option<bool>, limit: i64) -> Result<Vec<InsiderAlert>, AppError>;

    async fn get_watermark(&self, feed_name: &str) -> Result<Option<String>, AppError>;

    async fn set_watermark(&self, feed_name: &str, accession: &str) -> Result<(), AppError>;
}

/// Postgres-backed implementation, the store used in production.
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn upsert_transactions(&self, txns: &[InsiderTransaction]) -> Result<u64, AppError> {
        Ok(transaction_queries::upsert_transactions(&self.pool, txns).await?)
    }

    async fn get_transactions(
        &self,
        ticker: &str,
        days_back: i64,
        insider_name: Option<&str>,
    ) -> Result<Vec<InsiderTransaction>, AppError> {
        Ok(transaction_queries::get_transactions(&self.pool, ticker, days_back, insider_name).await?)
    }

    async fn get_recent_sellers(&self, ticker: &str, window_days: i64) -> Result<Vec<String>, AppError> {
        Ok(transaction_queries::get_recent_sellers(&self.pool, ticker, window_days).await?)
    }

    async fn get_profile(&self, ticker: &str, insider_name: &str) -> Result<Option<InsiderProfile>, AppError> {
        let Some(agg) = transaction_queries::profile_aggregate(&self.pool, ticker, insider_name).await? else {
            return Ok(None);
        };
        if agg.total_transactions == 0 {
            return Ok(None);
        }

        let (first, last) =
            transaction_queries::first_and_last_transaction_date(&self.pool, ticker, insider_name).await?;

        let avg_frequency_days = match (first, last) {
            (Some(first), Some(last)) if agg.total_transactions > 1 => {
                (last - first).num_days() as f64 / (agg.total_transactions - 1) as f64
            }
            _ => 0.0,
        };

        Ok(Some(InsiderProfile {
            insider_name: insider_name.to_string(),
            ticker: ticker.to_string(),
            avg_transaction_size: agg
                .avg_transaction_size
                .and_then(|v| v.to_string().parse().ok())
                .unwrap_or(0.0),
            avg_frequency_days,
            total_transactions: agg.total_transactions,
            typical_sell_percentage: agg.typical_sell_percentage.unwrap_or(0.0),
            last_transaction_date: last,
        }))
    }

    async fn save_anomaly(&self, anomaly: &InsiderAnomaly) -> Result<i64, AppError> {
        Ok(anomaly_queries::save_anomaly(&self.pool, anomaly).await?)
    }

    async fn get_anomalies(
        &self,
        ticker: Option<&str>,
        min_score: f64,
        limit: i64,
    ) -> Result<Vec<InsiderAnomaly>, AppError> {
        Ok(anomaly_queries::get_anomalies(&self.pool, ticker, min_score, limit).await?)
    }

    async fn save_alert(
        &self,
        ticker: &str,
        anomaly_score: f64,
        insider_sentiment: &str,
        recommendation: &str,
        composite_alpha_score: Option<f64>,
    ) -> Result<i64, AppError> {
        Ok(alert_queries::save_alert(
            &self.pool,
            ticker,
            anomaly_score,
            insider_sentiment,
            recommendation,
            composite_alpha_score,
        )
        .await?)
    }

    async fn get_alerts(&self, delivered: Option<bool>, limit: i64) -> Result<Vec<InsiderAlert>, AppError> {
        Ok(alert_queries::get_alerts(&self.pool, delivered, limit).await?)
    }

    async fn get_watermark(&self, feed_name: &str) -> Result<Option<String>, AppError> {
        Ok(watermark_queries::get_watermark(&self.pool, feed_name).await?)
    }

    async fn set_watermark(&self, feed_name: &str, accession: &str) -> Result<(), AppError> {
        Ok(watermark_queries::set_watermark(&self.pool, feed_name, accession).await?)
    }
}
