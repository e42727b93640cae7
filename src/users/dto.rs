use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::User;

/// Profile returned from the me endpoints, goal limits included.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub daily_calorie_limit: Option<i32>,
    pub daily_protein_limit: Option<f64>,
    pub daily_carbs_limit: Option<f64>,
    pub daily_fat_limit: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            daily_calorie_limit: user.daily_calorie_limit,
            daily_protein_limit: user.daily_protein_limit,
            daily_carbs_limit: user.daily_carbs_limit,
            daily_fat_limit: user.daily_fat_limit,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Goal limits payload. Each limit is independently nullable; the update
/// replaces all four, so an absent field clears its limit.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGoalsRequest {
    #[serde(default)]
    pub daily_calorie_limit: Option<i32>,
    #[serde(default)]
    pub daily_protein_limit: Option<f64>,
    #[serde(default)]
    pub daily_carbs_limit: Option<f64>,
    #[serde(default)]
    pub daily_fat_limit: Option<f64>,
}

/// The four limits in the shape the day view embeds next to consumed
/// totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GoalLimits {
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl From<&User> for GoalLimits {
    fn from(user: &User) -> Self {
        Self {
            calories: user.daily_calorie_limit,
            protein: user.daily_protein_limit,
            carbs: user.daily_carbs_limit,
            fat: user.daily_fat_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "eater@example.com".into(),
            password_hash: "secret-hash".into(),
            daily_calorie_limit: Some(2000),
            daily_protein_limit: Some(120.0),
            daily_carbs_limit: None,
            daily_fat_limit: None,
            created_at: datetime!(2025-05-01 08:00:00 UTC),
            updated_at: datetime!(2025-05-01 08:00:00 UTC),
        }
    }

    #[test]
    fn profile_never_carries_the_password_hash() {
        let json = serde_json::to_value(ProfileResponse::from(user())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["daily_calorie_limit"], 2000);
        assert_eq!(json["daily_carbs_limit"], serde_json::Value::Null);
        assert_eq!(json["created_at"], "2025-05-01T08:00:00Z");
        assert_eq!(json["updated_at"], "2025-05-01T08:00:00Z");
    }

    #[test]
    fn limits_serialize_with_short_names() {
        let json = serde_json::to_value(GoalLimits::from(&user())).unwrap();
        assert_eq!(json["calories"], 2000);
        assert_eq!(json["protein"], 120.0);
        assert_eq!(json["fat"], serde_json::Value::Null);
    }

    #[test]
    fn absent_goal_fields_default_to_null() {
        let req: UpdateGoalsRequest =
            serde_json::from_value(serde_json::json!({ "daily_calorie_limit": 1800 })).unwrap();
        assert_eq!(req.daily_calorie_limit, Some(1800));
        assert_eq!(req.daily_protein_limit, None);
    }
}
