use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::items::{normalize_items, MealItemInput, ValidItem};
use super::nutrition::Nutrient;

/// Distinguishes "field present, possibly null" from "field absent".
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateMealRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub consumed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<MealItemInput>>,
}

impl CreateMealRequest {
    pub fn valid_items(&self) -> Vec<ValidItem> {
        self.items
            .as_deref()
            .map(normalize_items)
            .unwrap_or_default()
    }
}

/// What an update payload said about the item list. Omitting `items`
/// (or sending null) leaves items untouched; an empty array is a
/// deliberate remove-all.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemsField {
    Untouched,
    Replace(Vec<ValidItem>),
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMealRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub consumed_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub items: Option<Vec<MealItemInput>>,
}

impl UpdateMealRequest {
    pub fn items_field(&self) -> ItemsField {
        match &self.items {
            None => ItemsField::Untouched,
            Some(raw) => ItemsField::Replace(normalize_items(raw)),
        }
    }
}

/// Edit submitted against a merged display group. The first meal ID
/// receives the update; the remaining IDs are deleted.
#[derive(Debug, Default, Deserialize)]
pub struct MergeEditRequest {
    #[serde(default)]
    pub meal_ids: Vec<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub consumed_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub items: Option<Vec<MealItemInput>>,
}

impl MergeEditRequest {
    pub fn as_update(&self) -> UpdateMealRequest {
        UpdateMealRequest {
            title: self.title.clone(),
            consumed_at: self.consumed_at,
            notes: self.notes.clone(),
            items: self.items.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListMealsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodItemResponse {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub food_name: String,
    pub serving_size: Option<String>,
    pub calories: i32,
    pub protein_grams: f64,
    pub carbs_grams: f64,
    pub fat_grams: f64,
    pub position: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub consumed_at: OffsetDateTime,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub items: Vec<FoodItemResponse>,
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}

impl Nutrient for MealResponse {
    fn calories(&self) -> i64 {
        self.total_calories
    }
    fn protein_grams(&self) -> f64 {
        self.total_protein
    }
    fn carbs_grams(&self) -> f64 {
        self.total_carbs
    }
    fn fat_grams(&self) -> f64 {
        self.total_fat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: serde_json::Value) -> UpdateMealRequest {
        serde_json::from_value(json).expect("update request should deserialize")
    }

    #[test]
    fn omitted_items_leave_items_untouched() {
        let req = update(serde_json::json!({ "title": "lunch" }));
        assert_eq!(req.items_field(), ItemsField::Untouched);
    }

    #[test]
    fn null_items_leave_items_untouched() {
        let req = update(serde_json::json!({ "items": null }));
        assert_eq!(req.items_field(), ItemsField::Untouched);
    }

    #[test]
    fn empty_items_array_means_remove_all() {
        let req = update(serde_json::json!({ "items": [] }));
        assert_eq!(req.items_field(), ItemsField::Replace(vec![]));
    }

    #[test]
    fn items_array_is_validated_on_resolution() {
        let req = update(serde_json::json!({
            "items": [
                { "food_name": "noodles", "calories": "310" },
                { "food_name": "   " },
            ]
        }));
        match req.items_field() {
            ItemsField::Replace(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].food_name, "noodles");
                assert_eq!(items[0].calories, 310);
            }
            ItemsField::Untouched => panic!("expected a replace"),
        }
    }

    #[test]
    fn notes_distinguish_absent_from_null() {
        assert_eq!(update(serde_json::json!({})).notes, None);
        assert_eq!(update(serde_json::json!({ "notes": null })).notes, Some(None));
        assert_eq!(
            update(serde_json::json!({ "notes": "late dinner" })).notes,
            Some(Some("late dinner".to_string()))
        );
    }

    #[test]
    fn create_request_tolerates_null_items() {
        let req: CreateMealRequest =
            serde_json::from_value(serde_json::json!({ "title": "dinner", "items": null }))
                .unwrap();
        assert!(req.valid_items().is_empty());
    }

    #[test]
    fn consumed_at_parses_rfc3339() {
        let req = update(serde_json::json!({ "consumed_at": "2025-06-01T12:30:00Z" }));
        let ts = req.consumed_at.unwrap();
        assert_eq!(ts.hour(), 12);
        assert_eq!(ts.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn merge_edit_converts_to_a_field_update() {
        let req: MergeEditRequest = serde_json::from_value(serde_json::json!({
            "meal_ids": ["5f0c0a00-0000-4000-8000-000000000001"],
            "title": "早餐",
            "items": [],
        }))
        .unwrap();
        assert_eq!(req.meal_ids.len(), 1);
        let update = req.as_update();
        assert_eq!(update.title.as_deref(), Some("早餐"));
        assert_eq!(update.items_field(), ItemsField::Replace(vec![]));
    }
}
