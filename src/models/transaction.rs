use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// SEC Form 4 transaction codes (Table I/II, column 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum TransactionCode {
    #[serde(rename = "P")]
    #[sqlx(rename = "P")]
    Purchase,
    #[serde(rename = "S")]
    #[sqlx(rename = "S")]
    Sale,
    #[serde(rename = "A")]
    #[sqlx(rename = "A")]
    Award,
    #[serde(rename = "D")]
    #[sqlx(rename = "D")]
    Disposition,
    #[serde(rename = "C")]
    #[sqlx(rename = "C")]
    Conversion,
    #[serde(rename = "M")]
    #[sqlx(rename = "M")]
    Exercise,
    #[serde(rename = "O")]
    #[sqlx(rename = "O")]
    Other,
}

impl TransactionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCode::Purchase => "P",
            TransactionCode::Sale => "S",
            TransactionCode::Award => "A",
            TransactionCode::Disposition => "D",
            TransactionCode::Conversion => "C",
            TransactionCode::Exercise => "M",
            TransactionCode::Other => "O",
        }
    }

    /// Maps a raw single-letter Form 4 code, defaulting to `Other` for anything unrecognized.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "P" => TransactionCode::Purchase,
            "S" => TransactionCode::Sale,
            "A" => TransactionCode::Award,
            "D" => TransactionCode::Disposition,
            "C" => TransactionCode::Conversion,
            "M" => TransactionCode::Exercise,
            _ => TransactionCode::Other,
        }
    }
}

/// A single Form 4 transaction, parsed from SEC EDGAR or loaded from the store.
///
/// Construction enforces the invariants required at ingestion (dates ordered,
/// shares non-negative); `total_value` is derived, never passed in directly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsiderTransaction {
    pub ticker: String,
    pub insider_name: String,
    pub insider_title: String,
    pub is_officer: bool,
    pub is_director: bool,
    pub transaction_date: NaiveDate,
    pub transaction_code: TransactionCode,
    pub shares: BigDecimal,
    pub price_per_share: Option<BigDecimal>,
    pub total_value: Option<BigDecimal>,
    pub shares_owned_after: Option<BigDecimal>,
    pub is_10b5_1: bool,
    pub filing_date: NaiveDate,
}

impl InsiderTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: String,
        insider_name: String,
        insider_title: String,
        is_officer: bool,
        is_director: bool,
        transaction_date: NaiveDate,
        transaction_code: TransactionCode,
        shares: BigDecimal,
        price_per_share: Option<BigDecimal>,
        shares_owned_after: Option<BigDecimal>,
        is_10b5_1: bool,
        filing_date: NaiveDate,
    ) -> Result<Self, String> {
        if transaction_date > filing_date {
            return Err(format!(
                "transaction_date {} is after filing_date {}",
                transaction_date, filing_date
            ));
        }
        if shares < BigDecimal::from(0) {
            return Err("shares must be non-negative".to_string());
        }

        let total_value = price_per_share.clone().map(|p| &shares * p);

        Ok(Self {
            ticker: ticker.to_uppercase(),
            insider_name,
            insider_title,
            is_officer,
            is_director,
            transaction_date,
            transaction_code,
            shares,
            price_per_share,
            total_value,
            shares_owned_after,
            is_10b5_1,
            filing_date,
        })
    }

    /// The composite identity key used for idempotent upserts.
    pub fn identity_key(&self) -> (String, String, NaiveDate, String, &'static str) {
        (
            self.ticker.clone(),
            self.insider_name.clone(),
            self.transaction_date,
            self.shares.to_string(),
            self.transaction_code.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(shares: i64, price: Option<i64>, tdate: &str, fdate: &str) -> Result<InsiderTransaction, String> {
        InsiderTransaction::new(
            "acme".into(),
            "Jane Doe".into(),
            "CEO".into(),
            true,
            false,
            tdate.parse().unwrap(),
            TransactionCode::Sale,
            BigDecimal::from(shares),
            price.map(BigDecimal::from),
            None,
            false,
            fdate.parse().unwrap(),
        )
    }

    #[test]
    fn uppercases_ticker_and_derives_total_value() {
        let t = tx(100, Some(10), "2024-01-01", "2024-01-02").unwrap();
        assert_eq!(t.ticker, "ACME");
        assert_eq!(t.total_value, Some(BigDecimal::from(1000)));
    }

    #[test]
    fn rejects_transaction_date_after_filing_date() {
        assert!(tx(100, Some(10), "2024-01-05", "2024-01-01").is_err());
    }

    #[test]
    fn rejects_negative_shares() {
        let err = InsiderTransaction::new(
            "acme".into(),
            "Jane Doe".into(),
            "CEO".into(),
            true,
            false,
            "2024-01-01".parse().unwrap(),
            TransactionCode::Sale,
            BigDecimal::from(-5),
            None,
            None,
            false,
            "2024-01-01".parse().unwrap(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn from_raw_defaults_unknown_codes_to_other() {
        assert_eq!(TransactionCode::from_raw("S"), TransactionCode::Sale);
        assert_eq!(TransactionCode::from_raw("x"), TransactionCode::Other);
    }
}
