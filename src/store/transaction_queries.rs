use std::collections::HashSet;

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;

use crate::models::{InsiderTransaction, TransactionCode};

pub async fn upsert_transaction(pool: &PgPool, tx: &InsiderTransaction) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO insider_transactions (
            ticker, insider_name, insider_title, is_officer, is_director,
            transaction_date, transaction_code, shares, price_per_share,
            total_value, shares_owned_after, is_10b5_1, filing_date
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
        ON CONFLICT (ticker, insider_name, transaction_date, shares, transaction_code)
        DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&tx.ticker)
    .bind(&tx.insider_name)
    .bind(&tx.insider_title)
    .bind(tx.is_officer)
    .bind(tx.is_director)
    .bind(tx.transaction_date)
    .bind(tx.transaction_code)
    .bind(&tx.shares)
    .bind(&tx.price_per_share)
    .bind(&tx.total_value)
    .bind(&tx.shares_owned_after)
    .bind(tx.is_10b5_1)
    .bind(tx.filing_date)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Bulk-insert transactions one at a time (each upsert is its own idempotent
/// statement), returning the count of rows that were actually newly created.
///
/// Batch-sweep windows overlap by design, so the same filing can show up in
/// two consecutive sweeps; rows are deduped by their identity key before
/// hitting the database to avoid redundant round trips.
pub async fn upsert_transactions(pool: &PgPool, txns: &[InsiderTransaction]) -> Result<u64, sqlx::Error> {
    let mut seen = HashSet::with_capacity(txns.len());
    let mut inserted = 0u64;
    for tx in txns {
        if !seen.insert(tx.identity_key()) {
            continue;
        }
        if upsert_transaction(pool, tx).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

pub async fn get_transactions(
    pool: &PgPool,
    ticker: &str,
    days_back: i64,
    insider_name: Option<&str>,
) -> Result<Vec<InsiderTransaction>, sqlx::Error> {
    let cutoff: NaiveDate = (Utc::now() - Duration::days(days_back)).date_naive();

    let rows = if let Some(name) = insider_name {
        sqlx::query_as::<_, InsiderTransaction>(
            r#"
            SELECT ticker, insider_name, insider_title, is_officer, is_director,
                   transaction_date, transaction_code, shares, price_per_share,
                   total_value, shares_owned_after, is_10b5_1, filing_date
            FROM insider_transactions
            WHERE ticker = $1 AND insider_name = $2 AND transaction_date >= $3
            ORDER BY transaction_date DESC
            "#,
        )
        .bind(ticker)
        .bind(name)
        .bind(cutoff)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, InsiderTransaction>(
            r#"
            SELECT ticker, insider_name, insider_title, is_officer, is_director,
                   transaction_date, transaction_code, shares, price_per_share,
                   total_value, shares_owned_after, is_10b5_1, filing_date
            FROM insider_transactions
            WHERE ticker = $1 AND transaction_date >= $2
            ORDER BY transaction_date DESC
            "#,
        )
        .bind(ticker)
        .bind(cutoff)
        .fetch_all(pool)
        .await?
    };

    Ok(rows)
}

pub async fn get_recent_sellers(pool: &PgPool, ticker: &str, window_days: i64) -> Result<Vec<String>, sqlx::Error> {
    let cutoff: NaiveDate = (Utc::now() - Duration::days(window_days)).date_naive();
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT insider_name FROM insider_transactions
        WHERE ticker = $1 AND transaction_code = $2 AND transaction_date >= $3
        "#,
    )
    .bind(ticker)
    .bind(TransactionCode::Sale)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

pub async fn first_and_last_transaction_date(
    pool: &PgPool,
    ticker: &str,
    insider_name: &str,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), sqlx::Error> {
    let row: (Option<NaiveDate>, Option<NaiveDate>) = sqlx::query_as(
        r#"
        SELECT MIN(transaction_date), MAX(transaction_date)
        FROM insider_transactions WHERE ticker = $1 AND insider_name = $2
        "#,
    )
    .bind(ticker)
    .bind(insider_name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub struct ProfileAggregate {
    pub total_transactions: i64,
    pub avg_transaction_size: Option<BigDecimal>,
    pub typical_sell_percentage: Option<f64>,
}

pub async fn profile_aggregate(
    pool: &PgPool,
    ticker: &str,
    insider_name: &str,
) -> Result<Option<ProfileAggregate>, sqlx::Error> {
    let row: Option<(i64, Option<BigDecimal>, Option<f64>)> = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total_transactions,
            AVG(shares * COALESCE(price_per_share, 0)) AS avg_transaction_size,
            AVG(
                CASE WHEN transaction_code = $3 AND shares_owned_after IS NOT NULL
                          AND (shares + shares_owned_after) > 0
                     THEN (shares / (shares + shares_owned_after))::float8
                     ELSE NULL
                END
            ) AS typical_sell_percentage
        FROM insider_transactions
        WHERE ticker = $1 AND insider_name = $2
        "#,
    )
    .bind(ticker)
    .bind(insider_name)
    .bind(TransactionCode::Sale)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(total_transactions, avg_transaction_size, typical_sell_percentage)| ProfileAggregate {
        total_transactions,
        avg_transaction_size,
        typical_sell_percentage,
    }))
}
