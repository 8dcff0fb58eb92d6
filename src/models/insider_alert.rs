use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted, actionable insider-trading alert (an [`crate::models::insider_signal::InsiderSignal`]
/// that cleared the configured anomaly-score threshold).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsiderAlert {
    pub id: i64,
    pub ticker: String,
    pub anomaly_score: f64,
    pub insider_sentiment: String,
    pub recommendation: String,
    pub composite_alpha_score: Option<f64>,
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}
