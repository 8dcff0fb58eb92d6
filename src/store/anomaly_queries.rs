use sqlx::PgPool;

use crate::models::{AnomalyType, InsiderAnomaly};

pub async fn save_anomaly(pool: &PgPool, anomaly: &InsiderAnomaly) -> Result<i64, sqlx::Error> {
    let id: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO insider_anomalies (ticker, insider_name, anomaly_type, severity_score, z_score, description)
        VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING id
        "#,
    )
    .bind(&anomaly.ticker)
    .bind(&anomaly.insider_name)
    .bind(anomaly.anomaly_type)
    .bind(anomaly.severity_score)
    .bind(anomaly.z_score)
    .bind(&anomaly.description)
    .fetch_one(pool)
    .await?;

    Ok(id.0)
}

#[derive(sqlx::FromRow)]
struct AnomalyRow {
    ticker: String,
    insider_name: String,
    anomaly_type: AnomalyType,
    severity_score: f64,
    z_score: f64,
    description: String,
}

impl From<AnomalyRow> for InsiderAnomaly {
    fn from(r: AnomalyRow) -> Self {
        InsiderAnomaly::new(r.ticker, r.insider_name, r.anomaly_type, r.severity_score, r.z_score, r.description)
    }
}

pub async fn get_anomalies(
    pool: &PgPool,
    ticker: Option<&str>,
    min_score: f64,
    limit: i64,
) -> Result<Vec<InsiderAnomaly>, sqlx::Error> {
    let rows = if let Some(ticker) = ticker {
        sqlx::query_as::<_, AnomalyRow>(
            r#"
            SELECT ticker, insider_name, anomaly_type, severity_score, z_score, description
            FROM insider_anomalies
            WHERE ticker = $1 AND severity_score >= $2
            ORDER BY detected_at DESC LIMIT $3
            "#,
        )
        .bind(ticker)
        .bind(min_score)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, AnomalyRow>(
            r#"
            SELECT ticker, insider_name, anomaly_type, severity_score, z_score, description
            FROM insider_anomalies
            WHERE severity_score >= $1
            ORDER BY detected_at DESC LIMIT $2
            "#,
        )
        .bind(min_score)
        .bind(limit)
        .fetch_all(pool)
        .await?
    };

    Ok(rows.into_iter().map(InsiderAnomaly::from).collect())
}
