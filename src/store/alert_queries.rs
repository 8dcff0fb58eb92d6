use sqlx::PgPool;

use crate::models::InsiderAlert;

#[allow(clippy::too_many_arguments)]
pub async fn save_alert(
    pool: &PgPool,
    ticker: &str,
    anomaly_score: f64,
    insider_sentiment: &str,
    recommendation: &str,
    composite_alpha_score: Option<f64>,
) -> Result<i64, sqlx::Error> {
    let id: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO insider_alerts
            (ticker, anomaly_score, insider_sentiment, recommendation, composite_alpha_score)
        VALUES ($1,$2,$3,$4,$5)
        RETURNING id
        "#,
    )
    .bind(ticker)
    .bind(anomaly_score)
    .bind(insider_sentiment)
    .bind(recommendation)
    .bind(composite_alpha_score)
    .fetch_one(pool)
    .await?;

    Ok(id.0)
}

pub async fn get_alerts(pool: &PgPool, delivered: Option<bool>, limit: i64) -> Result<Vec<InsiderAlert>, sqlx::Error> {
    let rows = if let Some(delivered) = delivered {
        sqlx::query_as::<_, InsiderAlert>(
            "SELECT * FROM insider_alerts WHERE delivered = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(delivered)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, InsiderAlert>("SELECT * FROM insider_alerts ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await?
    };

    Ok(rows)
}
