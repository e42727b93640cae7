use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::day::DayKey;
use super::dto::{FoodItemResponse, MealResponse};
use super::nutrition::Nutrient;

/// Label for meals whose title is empty.
pub const FALLBACK_TITLE: &str = "其他";

/// One logical entry shown for a set of same-day meals sharing a title.
/// Derived on every read and never persisted; the `id` and
/// `consumed_at` are the first constituent's.
#[derive(Debug, Clone, Serialize)]
pub struct MealGroup {
    pub id: Uuid,
    pub meal_ids: Vec<Uuid>,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub consumed_at: OffsetDateTime,
    pub notes: Option<String>,
    pub items: Vec<FoodItemResponse>,
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub meal_count: u32,
}

impl Nutrient for MealGroup {
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

/// Folds one day's meals into display groups keyed by title.
///
/// Meals outside `day` are dropped even if the caller already filtered.
/// Constituents keep their fetch order inside each group; the output is
/// sorted ascending by each group's representative `consumed_at`.
pub fn merge_day(meals: &[MealResponse], day: DayKey) -> Vec<MealGroup> {
    let mut groups: Vec<MealGroup> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for meal in meals.iter().filter(|m| day.contains(m.consumed_at)) {
        let title = if meal.title.is_empty() {
            FALLBACK_TITLE
        } else {
            meal.title.as_str()
        };
        let slot = *slots.entry(title.to_string()).or_insert_with(|| {
            groups.push(MealGroup {
                id: meal.id,
                meal_ids: Vec::new(),
                title: title.to_string(),
                consumed_at: meal.consumed_at,
                notes: None,
                items: Vec::new(),
                total_calories: 0,
                total_protein: 0.0,
                total_carbs: 0.0,
                total_fat: 0.0,
                meal_count: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.meal_ids.push(meal.id);
        group.items.extend(
            meal.items
                .iter()
                .filter(|item| !item.food_name.trim().is_empty())
                .cloned(),
        );
        group.total_calories += meal.total_calories;
        group.total_protein += meal.total_protein;
        group.total_carbs += meal.total_carbs;
        group.total_fat += meal.total_fat;
        group.meal_count += 1;

        if let Some(note) = meal.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            match &mut group.notes {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(note);
                }
                None => group.notes = Some(note.to_string()),
            }
        }
    }

    groups.sort_by_key(|group| group.consumed_at);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn meal(title: &str, at: OffsetDateTime) -> MealResponse {
        MealResponse {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.into(),
            consumed_at: at,
            notes: None,
            created_at: at,
            updated_at: at,
            items: Vec::new(),
            total_calories: 0,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fat: 0.0,
        }
    }

    fn with_item(mut meal: MealResponse, name: &str, calories: i32, protein: f64) -> MealResponse {
        let item = FoodItemResponse {
            id: Uuid::new_v4(),
            meal_id: meal.id,
            food_name: name.into(),
            serving_size: None,
            calories,
            protein_grams: protein,
            carbs_grams: 0.0,
            fat_grams: 0.0,
            position: meal.items.len() as i32,
            created_at: meal.consumed_at,
            updated_at: meal.consumed_at,
        };
        meal.total_calories += calories as i64;
        meal.total_protein += protein;
        meal.items.push(item);
        meal
    }

    fn with_notes(mut meal: MealResponse, notes: &str) -> MealResponse {
        meal.notes = Some(notes.into());
        meal
    }

    fn day() -> DayKey {
        "2025-06-01".parse().unwrap()
    }

    #[test]
    fn merges_same_day_meals_sharing_a_title() {
        let first = with_item(meal("早餐", datetime!(2025-06-01 07:00:00 UTC)), "粥", 150, 4.0);
        let second = with_item(meal("早餐", datetime!(2025-06-01 07:30:00 UTC)), "鸡蛋", 155, 12.6);

        let groups = merge_day(&[first.clone(), second.clone()], day());
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.meal_count, 2);
        assert_eq!(group.meal_ids, vec![first.id, second.id]);
        assert_eq!(group.items.len(), 2);
        assert_eq!(group.total_calories, 305);
        assert_eq!(group.total_protein, 16.6);
    }

    #[test]
    fn distinct_titles_stay_separate() {
        let breakfast = meal("早餐", datetime!(2025-06-01 07:00:00 UTC));
        let lunch = meal("午餐", datetime!(2025-06-01 12:00:00 UTC));

        let groups = merge_day(&[breakfast, lunch], day());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn representative_is_the_first_constituent_in_fetch_order() {
        // Fetch order is newest first; the representative follows it.
        let late = meal("午餐", datetime!(2025-06-01 13:00:00 UTC));
        let early = meal("午餐", datetime!(2025-06-01 12:00:00 UTC));

        let groups = merge_day(&[late.clone(), early.clone()], day());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, late.id);
        assert_eq!(groups[0].consumed_at, late.consumed_at);
        assert_eq!(groups[0].meal_ids, vec![late.id, early.id]);
    }

    #[test]
    fn output_is_sorted_ascending_by_representative_time() {
        let dinner = meal("晚餐", datetime!(2025-06-01 19:00:00 UTC));
        let breakfast = meal("早餐", datetime!(2025-06-01 07:00:00 UTC));
        let lunch = meal("午餐", datetime!(2025-06-01 12:00:00 UTC));

        let groups = merge_day(&[dinner, breakfast, lunch], day());
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["早餐", "午餐", "晚餐"]);
    }

    #[test]
    fn empty_title_falls_back_to_the_shared_label() {
        let unnamed_one = meal("", datetime!(2025-06-01 09:00:00 UTC));
        let unnamed_two = meal("", datetime!(2025-06-01 15:00:00 UTC));

        let groups = merge_day(&[unnamed_one, unnamed_two], day());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, FALLBACK_TITLE);
        assert_eq!(groups[0].meal_count, 2);
    }

    #[test]
    fn meals_outside_the_day_are_dropped() {
        let inside = meal("早餐", datetime!(2025-06-01 07:00:00 UTC));
        let outside = meal("早餐", datetime!(2025-06-02 00:00:01 UTC));

        let groups = merge_day(&[inside.clone(), outside], day());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].meal_ids, vec![inside.id]);
    }

    #[test]
    fn each_note_appears_once_joined_by_line_breaks() {
        let first = with_notes(meal("晚餐", datetime!(2025-06-01 19:00:00 UTC)), "出门吃的");
        let second = meal("晚餐", datetime!(2025-06-01 19:30:00 UTC));
        let third = with_notes(meal("晚餐", datetime!(2025-06-01 20:00:00 UTC)), "加了一份甜点");

        let groups = merge_day(&[first, second, third], day());
        assert_eq!(groups[0].notes.as_deref(), Some("出门吃的\n加了一份甜点"));
    }

    #[test]
    fn blank_items_are_refiltered_out_of_the_union() {
        let mut tainted = with_item(meal("午餐", datetime!(2025-06-01 12:00:00 UTC)), "米饭", 200, 4.0);
        tainted.items.push(FoodItemResponse {
            id: Uuid::new_v4(),
            meal_id: tainted.id,
            food_name: "   ".into(),
            serving_size: None,
            calories: 0,
            protein_grams: 0.0,
            carbs_grams: 0.0,
            fat_grams: 0.0,
            position: 1,
            created_at: tainted.consumed_at,
            updated_at: tainted.consumed_at,
        });

        let groups = merge_day(&[tainted], day());
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[0].items[0].food_name, "米饭");
    }

    #[test]
    fn zero_meals_yield_zero_groups() {
        assert!(merge_day(&[], day()).is_empty());
    }
}
