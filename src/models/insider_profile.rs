use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived baseline for one insider's historical trading behaviour at one ticker.
///
/// Never persisted directly, always recomputed from `insider_transactions` by
/// [`crate::store::TransactionStore::get_profile`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InsiderProfile {
    pub insider_name: String,
    pub ticker: String,
    pub avg_transaction_size: f64,
    pub avg_frequency_days: f64,
    pub total_transactions: i64,
    pub typical_sell_percentage: f64,
    pub last_transaction_date: Option<NaiveDate>,
}
