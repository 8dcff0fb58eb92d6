//! Two-tier anomaly detection engine for insider trading patterns.
//!
//! Tier 1 applies statistical rules (volume z-score, trading-frequency ratio,
//! holdings-percentage, cross-insider cluster selling). Tier 2 scores the
//! latest transaction against an [`IsolationForest`] trained on the ticker's
//! transaction history. The two tiers are blended, then adjusted for the
//! reporting insider's role and for 10b5-1 planned-trade discounting.

use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use ndarray::Array2;
use tracing::info;

use crate::errors::AppError;
use crate::models::{
    AnomalyType, InsiderAnomaly, InsiderProfile, InsiderSentiment, InsiderSignal, InsiderTransaction,
    TransactionCode,
};
use crate::services::isolation_forest::IsolationForest;
use crate::store::TransactionStore;

const VOLUME_Z_THRESHOLD: f64 = 2.0;
const FREQUENCY_RATIO_THRESHOLD: f64 = 0.25;
const CLUSTER_SELLER_THRESHOLD: usize = 3;
const HOLDINGS_PCT_THRESHOLD: f64 = 0.20;

const ROLE_WEIGHT_CEO_CFO: f64 = 1.5;
const ROLE_WEIGHT_OFFICER: f64 = 1.2;
const PLANNED_TRADE_DISCOUNT: f64 = 0.5;

fn to_f64(v: &BigDecimal) -> f64 {
    v.to_f64().unwrap_or(0.0)
}

pub struct AnomalyEngine {
    store: Arc<dyn TransactionStore>,
    lookback_days: i64,
    cluster_window_days: i64,
}

impl AnomalyEngine {
    pub fn new(store: Arc<dyn TransactionStore>, lookback_days: i64, cluster_window_days: i64) -> Self {
        Self { store, lookback_days, cluster_window_days }
    }

    /// Run full anomaly analysis for a single ticker, persisting every
    /// detected anomaly before returning the aggregated signal.
    pub async fn analyze_ticker(&self, ticker: &str) -> Result<InsiderSignal, AppError> {
        let txns = self.store.get_transactions(ticker, self.lookback_days, None).await?;
        if txns.is_empty() {
            return Ok(InsiderSignal::empty(ticker));
        }

        let insiders: HashSet<&str> = txns.iter().map(|t| t.insider_name.as_str()).collect();
        let mut all_anomalies = Vec::new();

        for name in insiders {
            let Some(profile) = self.store.get_profile(ticker, name).await? else {
                continue;
            };
            let person_txns: Vec<&InsiderTransaction> =
                txns.iter().filter(|t| t.insider_name == name).collect();
            all_anomalies.extend(Self::tier1_detect(&person_txns, &profile, ticker));
        }

        if let Some(cluster) = self.detect_cluster_selling(ticker).await? {
            all_anomalies.push(cluster);
        }

        let ml_score = Self::tier2_score(&txns);
        let anomaly_score = Self::compute_anomaly_score(&all_anomalies, ml_score, &txns);
        let sentiment = Self::derive_sentiment(anomaly_score, &txns);

        for anomaly in &all_anomalies {
            self.store.save_anomaly(anomaly).await?;
        }

        info!(ticker, anomaly_score, anomalies = all_anomalies.len(), "ticker analysis complete");

        Ok(InsiderSignal {
            ticker: ticker.to_string(),
            analysis_date: Utc::now(),
            anomaly_score,
            anomalies: all_anomalies,
            insider_sentiment: sentiment,
            recommendation: String::new(),
            composite_alpha_score: None,
        })
    }

    fn tier1_detect(txns: &[&InsiderTransaction], profile: &InsiderProfile, ticker: &str) -> Vec<InsiderAnomaly> {
        let mut anomalies = Vec::new();
        let Some(latest) = txns.first() else { return anomalies };
        let name = latest.insider_name.clone();

        let sizes: Vec<f64> = txns[1..]
            .iter()
            .filter_map(|t| t.price_per_share.as_ref().map(|p| to_f64(&t.shares) * to_f64(p)))
            .collect();
        if sizes.len() >= 3 {
            let latest_size = to_f64(&latest.shares) * latest.price_per_share.as_ref().map(to_f64).unwrap_or(0.0);
            let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;
            let variance = sizes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (sizes.len() as f64 - 1.0);
            let std = variance.sqrt();
            if std > 0.0 {
                let z = (latest_size - mean) / std;
                if z.abs() > VOLUME_Z_THRESHOLD {
                    anomalies.push(
                        InsiderAnomaly::new(
                            ticker,
                            &name,
                            AnomalyType::Volume,
                            (z.abs() / 5.0).min(1.0),
                            z,
                            format!("Transaction size z-score={z:.2} vs historical mean"),
                        )
                        .with_transactions(vec![(*latest).clone()]),
                    );
                }
            }
        }

        if profile.avg_frequency_days > 0.0 && txns.len() >= 2 {
            let days_since = (Utc::now().date_naive() - latest.transaction_date).num_days();
            if days_since > 0 {
                let ratio = days_since as f64 / profile.avg_frequency_days;
                if ratio < FREQUENCY_RATIO_THRESHOLD {
                    anomalies.push(
                        InsiderAnomaly::new(
                            ticker,
                            &name,
                            AnomalyType::Frequency,
                            (1.0 - ratio).min(1.0),
                            0.0,
                            format!(
                                "Traded {days_since}d after previous vs avg {:.0}d",
                                profile.avg_frequency_days
                            ),
                        )
                        .with_transactions(vec![(*txns[0]).clone(), (*txns[1]).clone()]),
                    );
                }
            }
        }

        if latest.transaction_code == TransactionCode::Sale {
            if let Some(owned_after) = &latest.shares_owned_after {
                let total_before = &latest.shares + owned_after;
                if total_before > BigDecimal::from(0) {
                    let pct_sold = to_f64(&latest.shares) / to_f64(&total_before);
                    if pct_sold > HOLDINGS_PCT_THRESHOLD {
                        anomalies.push(
                            InsiderAnomaly::new(
                                ticker,
                                &name,
                                AnomalyType::HoldingsPercentage,
                                pct_sold.min(1.0),
                                0.0,
                                format!("Sold {:.1}% of holdings in single transaction", pct_sold * 100.0),
                            )
                            .with_transactions(vec![(*latest).clone()]),
                        );
                    }
                }
            }
        }

        anomalies
    }

    async fn detect_cluster_selling(&self, ticker: &str) -> Result<Option<InsiderAnomaly>, AppError> {
        let sellers = self.store.get_recent_sellers(ticker, self.cluster_window_days).await?;
        if sellers.len() >= CLUSTER_SELLER_THRESHOLD {
            return Ok(Some(InsiderAnomaly::new(
                ticker,
                "MULTIPLE",
                AnomalyType::Cluster,
                (sellers.len() as f64 / 6.0).min(1.0),
                0.0,
                format!("{} insiders sold within {}d window", sellers.len(), self.cluster_window_days),
            )));
        }
        Ok(None)
    }

    fn tier2_score(txns: &[InsiderTransaction]) -> f64 {
        if txns.len() < 10 {
            return 0.0;
        }

        let mut sorted: Vec<&InsiderTransaction> = txns.iter().collect();
        sorted.sort_by_key(|t| t.transaction_date);

        let mut rows = Vec::with_capacity(sorted.len() * 4);
        for (i, tx) in sorted.iter().enumerate() {
            let size = to_f64(&tx.shares) * tx.price_per_share.as_ref().map(to_f64).unwrap_or(0.0);
            let days_since = if i > 0 { (tx.transaction_date - sorted[i - 1].transaction_date).num_days() as f64 } else { 0.0 };
            let pct_sold = if tx.transaction_code == TransactionCode::Sale {
                if let Some(owned) = &tx.shares_owned_after {
                    let total = &tx.shares + owned;
                    if total > BigDecimal::from(0) { to_f64(&tx.shares) / to_f64(&total) } else { 0.0 }
                } else {
                    0.0
                }
            } else {
                0.0
            };
            let is_csuite = if tx.is_officer { 1.0 } else { 0.0 };
            rows.extend_from_slice(&[size, days_since, pct_sold, is_csuite]);
        }

        if sorted.len() < 5 {
            return 0.0;
        }

        let features = Array2::from_shape_vec((sorted.len(), 4), rows).expect("feature matrix shape");
        let forest = IsolationForest::fit_default(&features);
        let latest_row = features.row(features.nrows() - 1).to_vec();
        forest.anomaly_score_0_1(&latest_row)
    }

    fn compute_anomaly_score(anomalies: &[InsiderAnomaly], ml_score: f64, txns: &[InsiderTransaction]) -> f64 {
        if anomalies.is_empty() && ml_score == 0.0 {
            return 0.0;
        }

        let tier1_max = anomalies.iter().map(|a| a.severity_score).fold(0.0, f64::max);
        let type_count = anomalies.iter().map(|a| a.anomaly_type.as_str()).collect::<HashSet<_>>().len();
        let co_occurrence_boost = if type_count > 1 { (type_count as f64 * 0.05).min(0.2) } else { 0.0 };

        let base = 0.6 * tier1_max + 0.4 * ml_score + co_occurrence_boost;

        let mut role_weight = 1.0f64;
        for tx in txns.iter().take(5) {
            let title_lower = tx.insider_title.to_lowercase();
            if title_lower.contains("ceo")
                || title_lower.contains("chief executive")
                || title_lower.contains("cfo")
                || title_lower.contains("chief financial")
            {
                role_weight = role_weight.max(ROLE_WEIGHT_CEO_CFO);
            } else if tx.is_officer {
                role_weight = role_weight.max(ROLE_WEIGHT_OFFICER);
            }
        }

        let window: Vec<&InsiderTransaction> = txns.iter().take(10).collect();
        let planned_ratio = window.iter().filter(|t| t.is_10b5_1).count() as f64 / window.len().max(1) as f64;
        let planned_discount = 1.0 - (planned_ratio * (1.0 - PLANNED_TRADE_DISCOUNT));

        (base * role_weight * planned_discount).clamp(0.0, 1.0)
    }

    fn derive_sentiment(anomaly_score: f64, txns: &[InsiderTransaction]) -> InsiderSentiment {
        let sells = txns.iter().filter(|t| t.transaction_code == TransactionCode::Sale).count();
        let buys = txns.iter().filter(|t| t.transaction_code == TransactionCode::Purchase).count();
        if anomaly_score > 0.6 && sells > buys {
            InsiderSentiment::Bearish
        } else if buys > sells {
            InsiderSentiment::Bullish
        } else {
            InsiderSentiment::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn mk_tx(shares: i64, price: i64, date: &str, code: TransactionCode, owned_after: Option<i64>) -> InsiderTransaction {
        mk_tx_planned(shares, price, date, code, owned_after, false)
    }

    fn mk_tx_planned(
        shares: i64,
        price: i64,
        date: &str,
        code: TransactionCode,
        owned_after: Option<i64>,
        is_10b5_1: bool,
    ) -> InsiderTransaction {
        InsiderTransaction::new(
            "ACME".into(),
            "Jane Doe".into(),
            "CEO".into(),
            true,
            false,
            date.parse().unwrap(),
            code,
            BigDecimal::from(shares),
            Some(BigDecimal::from(price)),
            owned_after.map(BigDecimal::from),
            is_10b5_1,
            date.parse().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn volume_anomaly_detected_for_outsized_transaction() {
        let txns = vec![
            mk_tx(100, 10, "2024-06-01", TransactionCode::Sale, Some(900)),
            mk_tx(110, 10, "2024-05-01", TransactionCode::Sale, Some(1000)),
            mk_tx(90, 10, "2024-04-01", TransactionCode::Sale, Some(1100)),
            mk_tx(10_000, 10, "2024-07-01", TransactionCode::Sale, Some(0)),
        ];
        // latest (index 0 by construction order matches txns[0] in the engine's contract)
        let refs: Vec<&InsiderTransaction> = vec![&txns[3], &txns[0], &txns[1], &txns[2]];
        let profile = InsiderProfile { avg_frequency_days: 0.0, ..Default::default() };
        let anomalies = super::AnomalyEngine::tier1_detect(&refs, &profile, "ACME");
        assert!(anomalies.iter().any(|a| a.anomaly_type == AnomalyType::Volume));
    }

    #[test]
    fn holdings_percentage_anomaly_on_large_sale() {
        let tx = mk_tx(900, 10, "2024-06-01", TransactionCode::Sale, Some(100));
        let refs = vec![&tx];
        let profile = InsiderProfile::default();
        let anomalies = super::AnomalyEngine::tier1_detect(&refs, &profile, "ACME");
        assert!(anomalies.iter().any(|a| a.anomaly_type == AnomalyType::HoldingsPercentage));
    }

    #[test]
    fn no_anomalies_for_ordinary_small_sale() {
        let tx = mk_tx(10, 10, "2024-06-01", TransactionCode::Sale, Some(990));
        let refs = vec![&tx];
        let profile = InsiderProfile::default();
        let anomalies = super::AnomalyEngine::tier1_detect(&refs, &profile, "ACME");
        assert!(anomalies.is_empty());
    }

    #[test]
    fn sentiment_is_bearish_for_high_score_and_net_selling() {
        let txns = vec![mk_tx(100, 10, "2024-06-01", TransactionCode::Sale, Some(900))];
        assert_eq!(super::AnomalyEngine::derive_sentiment(0.8, &txns), InsiderSentiment::Bearish);
    }

    #[test]
    fn sentiment_is_bullish_when_buys_exceed_sells() {
        let txns = vec![
            mk_tx(100, 10, "2024-06-01", TransactionCode::Purchase, Some(900)),
            mk_tx(50, 10, "2024-05-01", TransactionCode::Purchase, Some(800)),
            mk_tx(10, 10, "2024-04-01", TransactionCode::Sale, Some(790)),
        ];
        assert_eq!(super::AnomalyEngine::derive_sentiment(0.1, &txns), InsiderSentiment::Bullish);
    }

    #[test]
    fn planned_trades_discount_anomaly_score_by_half() {
        let anomaly = InsiderAnomaly::new("ACME", "Jane Doe", AnomalyType::Volume, 0.5, 4.0, "outsized sale");
        let anomalies = vec![anomaly];

        let unplanned = vec![
            mk_tx_planned(10_000, 10, "2024-07-01", TransactionCode::Sale, Some(0), false),
            mk_tx_planned(100, 10, "2024-06-01", TransactionCode::Sale, Some(900), false),
        ];
        let planned = vec![
            mk_tx_planned(10_000, 10, "2024-07-01", TransactionCode::Sale, Some(0), true),
            mk_tx_planned(100, 10, "2024-06-01", TransactionCode::Sale, Some(900), true),
        ];

        let base_score = super::AnomalyEngine::compute_anomaly_score(&anomalies, 0.3, &unplanned);
        let planned_score = super::AnomalyEngine::compute_anomaly_score(&anomalies, 0.3, &planned);

        assert!(
            planned_score <= 0.5 * base_score + 1e-9,
            "planned={planned_score} base={base_score}"
        );
        assert!((planned_score - 0.5 * base_score).abs() < 1e-9);
    }
}
