use serde::{Deserialize, Serialize};

use super::transaction::InsiderTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum AnomalyType {
    Volume,
    Frequency,
    Cluster,
    HoldingsPercentage,
    Timing,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::Volume => "VOLUME",
            AnomalyType::Frequency => "FREQUENCY",
            AnomalyType::Cluster => "CLUSTER",
            AnomalyType::HoldingsPercentage => "HOLDINGS_PERCENTAGE",
            AnomalyType::Timing => "TIMING",
        }
    }
}

/// A single detected anomaly in insider trading behaviour, emitted by Tier-1 rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderAnomaly {
    pub ticker: String,
    pub insider_name: String,
    pub anomaly_type: AnomalyType,
    pub severity_score: f64,
    pub z_score: f64,
    pub description: String,
    #[serde(default)]
    pub transactions: Vec<InsiderTransaction>,
}

impl InsiderAnomaly {
    pub fn new(
        ticker: impl Into<String>,
        insider_name: impl Into<String>,
        anomaly_type: AnomalyType,
        severity_score: f64,
        z_score: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            insider_name: insider_name.into(),
            anomaly_type,
            severity_score: severity_score.clamp(0.0, 1.0),
            z_score,
            description: description.into(),
            transactions: Vec::new(),
        }
    }

    pub fn with_transactions(mut self, transactions: Vec<InsiderTransaction>) -> Self {
        self.transactions = transactions;
        self
    }
}
