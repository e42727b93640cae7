use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::UpdateGoalsRequest;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub daily_calorie_limit: Option<i32>,
    pub daily_protein_limit: Option<f64>,
    pub daily_carbs_limit: Option<f64>,
    pub daily_fat_limit: Option<f64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, daily_calorie_limit, daily_protein_limit,
                   daily_carbs_limit, daily_fat_limit, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, daily_calorie_limit, daily_protein_limit,
                   daily_carbs_limit, daily_fat_limit, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, daily_calorie_limit, daily_protein_limit,
                      daily_carbs_limit, daily_fat_limit, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Replaces all four limits; an absent field clears its limit.
    pub async fn update_goals(
        db: &PgPool,
        id: Uuid,
        goals: &UpdateGoalsRequest,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET daily_calorie_limit = $2,
                   daily_protein_limit = $3,
                   daily_carbs_limit = $4,
                   daily_fat_limit = $5,
                   updated_at = NOW()
             WHERE id = $1
            RETURNING id, email, password_hash, daily_calorie_limit, daily_protein_limit,
                      daily_carbs_limit, daily_fat_limit, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(goals.daily_calorie_limit)
        .bind(goals.daily_protein_limit)
        .bind(goals.daily_carbs_limit)
        .bind(goals.daily_fat_limit)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
