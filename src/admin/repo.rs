use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug)]
pub struct CleanupOutcome {
    pub deleted_meals: i64,
    pub deleted_items: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct CleanupLogRow {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub cleanup_date: OffsetDateTime,
    pub days_kept: i32,
    pub deleted_meals: i32,
    pub deleted_items: i32,
}

/// Deletes every meal consumed before `cutoff` (items go with them via
/// cascade) and records the run in `cleanup_log`.
pub async fn purge_before(
    db: &PgPool,
    cutoff: OffsetDateTime,
    days_kept: i64,
) -> anyhow::Result<CleanupOutcome> {
    let mut tx = db.begin().await.context("begin cleanup transaction")?;

    // Counted up front because the cascade delete reports meal rows only.
    let (deleted_items,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM meal_items mi
        JOIN meals m ON m.id = mi.meal_id
        WHERE m.consumed_at < $1
        "#,
    )
    .bind(cutoff)
    .fetch_one(&mut *tx)
    .await
    .context("count expired food items")?;

    let deleted_meals = sqlx::query("DELETE FROM meals WHERE consumed_at < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .context("delete expired meals")?
        .rows_affected() as i64;

    sqlx::query(
        "INSERT INTO cleanup_log (days_kept, deleted_meals, deleted_items) VALUES ($1, $2, $3)",
    )
    .bind(days_kept as i32)
    .bind(deleted_meals as i32)
    .bind(deleted_items as i32)
    .execute(&mut *tx)
    .await
    .context("record cleanup run")?;

    tx.commit().await.context("commit cleanup transaction")?;

    Ok(CleanupOutcome {
        deleted_meals,
        deleted_items,
    })
}

pub async fn history(db: &PgPool, limit: i64) -> anyhow::Result<Vec<CleanupLogRow>> {
    sqlx::query_as::<_, CleanupLogRow>(
        r#"
        SELECT id, cleanup_date, days_kept, deleted_meals, deleted_items
        FROM cleanup_log
        ORDER BY cleanup_date DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
    .context("load cleanup history")
}
