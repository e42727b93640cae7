use serde::Deserialize;

/// A nutrient field as clients actually send it: a number, a string
/// holding a number, a string holding garbage, null, or nothing at all.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl NumericField {
    /// Best-effort numeric reading. Unparseable input counts as zero and
    /// negative or non-finite values clamp to zero.
    pub fn as_f64(&self) -> f64 {
        let raw = match self {
            NumericField::Number(n) => *n,
            NumericField::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            NumericField::Empty => 0.0,
        };
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            0.0
        }
    }

    /// Integer reading used for calories. Fractions truncate toward zero;
    /// float to int casts saturate, so oversized values pin at `i32::MAX`.
    pub fn as_calories(&self) -> i32 {
        self.as_f64() as i32
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealItemInput {
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub serving_size: Option<String>,
    #[serde(default)]
    pub calories: NumericField,
    #[serde(default)]
    pub protein_grams: NumericField,
    #[serde(default)]
    pub carbs_grams: NumericField,
    #[serde(default)]
    pub fat_grams: NumericField,
}

/// An item that passed validation: trimmed, non-empty name and
/// normalized nutrients.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidItem {
    pub food_name: String,
    pub serving_size: Option<String>,
    pub calories: i32,
    pub protein_grams: f64,
    pub carbs_grams: f64,
    pub fat_grams: f64,
}

impl MealItemInput {
    /// `None` when the food name is missing or blank after trimming.
    pub fn normalize(&self) -> Option<ValidItem> {
        let food_name = self.food_name.as_deref().map(str::trim).unwrap_or("");
        if food_name.is_empty() {
            return None;
        }
        Some(ValidItem {
            food_name: food_name.to_string(),
            serving_size: self
                .serving_size
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            calories: self.calories.as_calories(),
            protein_grams: self.protein_grams.as_f64(),
            carbs_grams: self.carbs_grams.as_f64(),
            fat_grams: self.fat_grams.as_f64(),
        })
    }
}

/// Drops invalid entries instead of rejecting the whole payload.
pub fn normalize_items(items: &[MealItemInput]) -> Vec<ValidItem> {
    items.iter().filter_map(MealItemInput::normalize).collect()
}
