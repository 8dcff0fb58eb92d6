use sqlx::PgPool;

pub async fn get_watermark(pool: &PgPool, feed_name: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_seen_accession FROM monitor_watermarks WHERE feed_name = $1")
            .bind(feed_name)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(accession,)| accession))
}

pub async fn set_watermark(pool: &PgPool, feed_name: &str, accession: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO monitor_watermarks (feed_name, last_seen_accession, last_poll_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (feed_name) DO UPDATE
            SET last_seen_accession = $2, last_poll_at = NOW()
        "#,
    )
    .bind(feed_name)
    .bind(accession)
    .execute(pool)
    .await?;

    Ok(())
}
