use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::ItemsField;
use super::items::ValidItem;

#[derive(Debug, Clone, FromRow)]
pub struct MealTotalsRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub consumed_at: OffsetDateTime,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct FoodItemRow {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub food_name: String,
    pub serving_size: Option<String>,
    pub calories: i32,
    pub protein_grams: f64,
    pub carbs_grams: f64,
    pub fat_grams: f64,
    pub position: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct DayTotalsRow {
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub meal_count: i64,
}

/// Fields of a meal row an update may touch. `notes` carries the
/// supplied-vs-null distinction through to the SQL.
#[derive(Debug, Clone, Default)]
pub struct MealPatch {
    pub title: Option<String>,
    pub consumed_at: Option<OffsetDateTime>,
    pub notes: Option<Option<String>>,
}

impl MealPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.consumed_at.is_none() && self.notes.is_none()
    }
}

const MEAL_WITH_TOTALS: &str = r#"
    SELECT m.id, m.user_id, m.title, m.consumed_at, m.notes, m.created_at, m.updated_at,
           COALESCE(SUM(mi.calories), 0)::BIGINT AS total_calories,
           COALESCE(SUM(mi.protein_grams), 0)::DOUBLE PRECISION AS total_protein,
           COALESCE(SUM(mi.carbs_grams), 0)::DOUBLE PRECISION AS total_carbs,
           COALESCE(SUM(mi.fat_grams), 0)::DOUBLE PRECISION AS total_fat
      FROM meals m
      LEFT JOIN meal_items mi ON mi.meal_id = m.id
"#;

/// Inserts a meal and its items in one transaction; nothing persists if
/// any insert fails. Returns the new meal's id.
pub async fn create_with_items(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    consumed_at: Option<OffsetDateTime>,
    notes: Option<&str>,
    items: &[ValidItem],
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;

    let (meal_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO meals (user_id, title, consumed_at, notes)
        VALUES ($1, $2, COALESCE($3, NOW()), $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(consumed_at)
    .bind(notes)
    .fetch_one(&mut *tx)
    .await
    .context("insert meal")?;

    for (position, item) in items.iter().enumerate() {
        insert_item_tx(&mut tx, meal_id, position as i32, item).await?;
    }

    tx.commit().await.context("commit tx")?;
    Ok(meal_id)
}

async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    position: i32,
    item: &ValidItem,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meal_items
            (meal_id, food_name, serving_size, calories, protein_grams, carbs_grams, fat_grams, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(meal_id)
    .bind(&item.food_name)
    .bind(&item.serving_size)
    .bind(item.calories)
    .bind(item.protein_grams)
    .bind(item.carbs_grams)
    .bind(item.fat_grams)
    .bind(position)
    .execute(&mut **tx)
    .await
    .context("insert meal item")?;

    Ok(())
}

/// All of a user's meals annotated with item sums, newest first,
/// optionally restricted to a half-open `[start, end)` window.
pub async fn list_with_totals(
    db: &PgPool,
    user_id: Uuid,
    window: Option<(OffsetDateTime, OffsetDateTime)>,
) -> anyhow::Result<Vec<MealTotalsRow>> {
    let (start, end) = match window {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    let sql = format!(
        r#"{MEAL_WITH_TOTALS}
     WHERE m.user_id = $1
       AND ($2::timestamptz IS NULL OR (m.consumed_at >= $2 AND m.consumed_at < $3))
     GROUP BY m.id
     ORDER BY m.consumed_at DESC
        "#
    );

    let rows = sqlx::query_as::<_, MealTotalsRow>(&sql)
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await
        .context("list meals with totals")?;

    Ok(rows)
}

pub async fn get_with_totals(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
) -> anyhow::Result<Option<MealTotalsRow>> {
    let sql = format!(
        r#"{MEAL_WITH_TOTALS}
     WHERE m.user_id = $1 AND m.id = $2
     GROUP BY m.id
        "#
    );

    let row = sqlx::query_as::<_, MealTotalsRow>(&sql)
        .bind(user_id)
        .bind(meal_id)
        .fetch_optional(db)
        .await
        .context("get meal with totals")?;

    Ok(row)
}

pub async fn items_for_meal(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Vec<FoodItemRow>> {
    let rows = sqlx::query_as::<_, FoodItemRow>(
        r#"
        SELECT id, meal_id, food_name, serving_size, calories,
               protein_grams, carbs_grams, fat_grams, position, created_at, updated_at
          FROM meal_items
         WHERE meal_id = $1
         ORDER BY position, created_at
        "#,
    )
    .bind(meal_id)
    .fetch_all(db)
    .await
    .context("list items for meal")?;

    Ok(rows)
}

/// Items for a whole set of meals in one round trip.
pub async fn items_for_meals(db: &PgPool, meal_ids: &[Uuid]) -> anyhow::Result<Vec<FoodItemRow>> {
    let rows = sqlx::query_as::<_, FoodItemRow>(
        r#"
        SELECT id, meal_id, food_name, serving_size, calories,
               protein_grams, carbs_grams, fat_grams, position, created_at, updated_at
          FROM meal_items
         WHERE meal_id = ANY($1)
         ORDER BY meal_id, position, created_at
        "#,
    )
    .bind(meal_ids)
    .fetch_all(db)
    .await
    .context("list items for meals")?;

    Ok(rows)
}

/// Applies a field patch and, when requested, the destroy-and-recreate
/// item replacement, as one transaction. The meal row is locked first so
/// concurrent replaces cannot interleave delete and insert steps.
/// Returns false when the meal does not exist or is not the user's.
pub async fn update_meal(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
    patch: &MealPatch,
    items: &ItemsField,
) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin tx")?;

    let owned: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM meals WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(meal_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock meal for update")?;

    if owned.is_none() {
        return Ok(false);
    }

    if !patch.is_empty() {
        sqlx::query(
            r#"
            UPDATE meals
               SET title = COALESCE($2, title),
                   consumed_at = COALESCE($3, consumed_at),
                   notes = CASE WHEN $4 THEN $5 ELSE notes END,
                   updated_at = NOW()
             WHERE id = $1
            "#,
        )
        .bind(meal_id)
        .bind(&patch.title)
        .bind(patch.consumed_at)
        .bind(patch.notes.is_some())
        .bind(patch.notes.clone().flatten())
        .execute(&mut *tx)
        .await
        .context("update meal fields")?;
    }

    if let ItemsField::Replace(items) = items {
        sqlx::query("DELETE FROM meal_items WHERE meal_id = $1")
            .bind(meal_id)
            .execute(&mut *tx)
            .await
            .context("delete old meal items")?;

        for (position, item) in items.iter().enumerate() {
            insert_item_tx(&mut tx, meal_id, position as i32, item).await?;
        }
    }

    tx.commit().await.context("commit tx")?;
    Ok(true)
}

/// Returns false when nothing was deleted, so a second delete of the
/// same id reports not-found instead of silently succeeding.
pub async fn delete_meal(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM meals WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal")?;

    Ok(result.rows_affected() > 0)
}

pub async fn meal_owned(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM meals WHERE id = $1 AND user_id = $2")
            .bind(meal_id)
            .bind(user_id)
            .fetch_optional(db)
            .await
            .context("check meal ownership")?;

    Ok(row.is_some())
}

/// Appends one item after the meal's current items.
pub async fn insert_item(
    db: &PgPool,
    meal_id: Uuid,
    item: &ValidItem,
) -> anyhow::Result<FoodItemRow> {
    let row = sqlx::query_as::<_, FoodItemRow>(
        r#"
        INSERT INTO meal_items
            (meal_id, food_name, serving_size, calories, protein_grams, carbs_grams, fat_grams, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM meal_items WHERE meal_id = $1))
        RETURNING id, meal_id, food_name, serving_size, calories,
                  protein_grams, carbs_grams, fat_grams, position, created_at, updated_at
        "#,
    )
    .bind(meal_id)
    .bind(&item.food_name)
    .bind(&item.serving_size)
    .bind(item.calories)
    .bind(item.protein_grams)
    .bind(item.carbs_grams)
    .bind(item.fat_grams)
    .fetch_one(db)
    .await
    .context("insert meal item")?;

    Ok(row)
}

pub async fn update_item(
    db: &PgPool,
    meal_id: Uuid,
    item_id: Uuid,
    item: &ValidItem,
) -> anyhow::Result<Option<FoodItemRow>> {
    let row = sqlx::query_as::<_, FoodItemRow>(
        r#"
        UPDATE meal_items
           SET food_name = $3,
               serving_size = $4,
               calories = $5,
               protein_grams = $6,
               carbs_grams = $7,
               fat_grams = $8,
               updated_at = NOW()
         WHERE id = $1 AND meal_id = $2
        RETURNING id, meal_id, food_name, serving_size, calories,
                  protein_grams, carbs_grams, fat_grams, position, created_at, updated_at
        "#,
    )
    .bind(item_id)
    .bind(meal_id)
    .bind(&item.food_name)
    .bind(&item.serving_size)
    .bind(item.calories)
    .bind(item.protein_grams)
    .bind(item.carbs_grams)
    .bind(item.fat_grams)
    .fetch_optional(db)
    .await
    .context("update meal item")?;

    Ok(row)
}

pub async fn delete_item(db: &PgPool, meal_id: Uuid, item_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM meal_items WHERE id = $1 AND meal_id = $2")
        .bind(item_id)
        .bind(meal_id)
        .execute(db)
        .await
        .context("delete meal item")?;

    Ok(result.rows_affected() > 0)
}

/// Whole-day sums straight from SQL, for the stat cards.
pub async fn day_totals(
    db: &PgPool,
    user_id: Uuid,
    window: (OffsetDateTime, OffsetDateTime),
) -> anyhow::Result<DayTotalsRow> {
    let row = sqlx::query_as::<_, DayTotalsRow>(
        r#"
        SELECT COALESCE(SUM(mi.calories), 0)::BIGINT AS total_calories,
               COALESCE(SUM(mi.protein_grams), 0)::DOUBLE PRECISION AS total_protein,
               COALESCE(SUM(mi.carbs_grams), 0)::DOUBLE PRECISION AS total_carbs,
               COALESCE(SUM(mi.fat_grams), 0)::DOUBLE PRECISION AS total_fat,
               COUNT(DISTINCT m.id) AS meal_count
          FROM meals m
          LEFT JOIN meal_items mi ON mi.meal_id = m.id
         WHERE m.user_id = $1 AND m.consumed_at >= $2 AND m.consumed_at < $3
        "#,
    )
    .bind(user_id)
    .bind(window.0)
    .bind(window.1)
    .fetch_one(db)
    .await
    .context("sum day totals")?;

    Ok(row)
}
