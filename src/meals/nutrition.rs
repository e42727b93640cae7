use serde::Serialize;

use super::items::ValidItem;

/// Anything that contributes nutrition to a total: a food item row, a
/// meal annotated with its item sums, or a merged display group.
pub trait Nutrient {
    fn calories(&self) -> i64;
    fn protein_grams(&self) -> f64;
    fn carbs_grams(&self) -> f64;
    fn fat_grams(&self) -> f64;
}

impl Nutrient for ValidItem {
    fn calories(&self) -> i64 {
        self.calories as i64
    }
    fn protein_grams(&self) -> f64 {
        self.protein_grams
    }
    fn carbs_grams(&self) -> f64 {
        self.carbs_grams
    }
    fn fat_grams(&self) -> f64 {
        self.fat_grams
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionTotals {
    pub fn add<N: Nutrient + ?Sized>(&mut self, source: &N) {
        self.calories += source.calories();
        self.protein += sanitize(source.protein_grams());
        self.carbs += sanitize(source.carbs_grams());
        self.fat += sanitize(source.fat_grams());
    }
}

/// Totals never carry `NaN` or infinities, whatever the inputs held.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Sums nutrition over any collection. An empty collection yields
/// all-zero totals.
pub fn aggregate<'a, N, I>(sources: I) -> NutritionTotals
where
    N: Nutrient + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let mut totals = NutritionTotals::default();
    for source in sources {
        totals.add(source);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(calories: i32, protein: f64, carbs: f64, fat: f64) -> ValidItem {
        ValidItem {
            food_name: "food".into(),
            serving_size: None,
            calories,
            protein_grams: protein,
            carbs_grams: carbs,
            fat_grams: fat,
        }
    }

    #[test]
    fn empty_input_yields_zero_totals() {
        let totals = aggregate::<ValidItem, _>(&[]);
        assert_eq!(totals, NutritionTotals::default());
        assert!(!totals.protein.is_nan());
    }

    #[test]
    fn sums_across_items() {
        let items = vec![item(200, 10.0, 30.0, 5.0), item(150, 7.5, 0.0, 2.5)];
        let totals = aggregate(&items);
        assert_eq!(totals.calories, 350);
        assert_eq!(totals.protein, 17.5);
        assert_eq!(totals.carbs, 30.0);
        assert_eq!(totals.fat, 7.5);
    }

    #[test]
    fn non_finite_components_count_as_zero() {
        let items = vec![item(100, f64::NAN, f64::INFINITY, 1.0)];
        let totals = aggregate(&items);
        assert_eq!(totals.calories, 100);
        assert_eq!(totals.protein, 0.0);
        assert_eq!(totals.carbs, 0.0);
        assert_eq!(totals.fat, 1.0);
    }
}
