use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::insider_anomaly::InsiderAnomaly;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum InsiderSentiment {
    Bearish,
    #[default]
    Neutral,
    Bullish,
}

impl InsiderSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsiderSentiment::Bearish => "BEARISH",
            InsiderSentiment::Neutral => "NEUTRAL",
            InsiderSentiment::Bullish => "BULLISH",
        }
    }
}

/// Aggregated insider-trading signal for a single ticker, the output of [`crate::services::anomaly_engine::AnomalyEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderSignal {
    pub ticker: String,
    pub analysis_date: DateTime<Utc>,
    pub anomaly_score: f64,
    pub anomalies: Vec<InsiderAnomaly>,
    pub insider_sentiment: InsiderSentiment,
    pub recommendation: String,
    pub composite_alpha_score: Option<f64>,
}

impl InsiderSignal {
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            analysis_date: Utc::now(),
            anomaly_score: 0.0,
            anomalies: Vec::new(),
            insider_sentiment: InsiderSentiment::Neutral,
            recommendation: String::new(),
            composite_alpha_score: None,
        }
    }
}
