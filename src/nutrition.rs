//! Nutrition aggregation over meal entries.
//!
//! Food nutrient profiles are defined per 100 g; an entry's contribution is
//! its profile scaled by `quantity_g / 100`. Everything here is a pure
//! reduction over already-fetched rows, with no I/O and no rounding.
//! Display formatting belongs to clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::dates;

/// Meal slot a food was eaten in. Entries without one bucket as "other".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Per-100 g nutrient values of a food. Missing fields degrade to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

/// Accumulated nutrient sums across a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl NutrientTotals {
    fn accumulate(&mut self, food: &NutrientProfile, multiplier: f64) {
        self.calories += food.calories * multiplier;
        self.protein += food.protein * multiplier;
        self.fat += food.fat * multiplier;
        self.carbs += food.carbs * multiplier;
        self.fiber += food.fiber * multiplier;
        self.sugar += food.sugar * multiplier;
        self.sodium += food.sodium * multiplier;
    }
}

#[derive(Debug, thiserror::Error)]
#[error("meal entry quantity must be a positive number of grams, got {0}")]
pub struct InvalidQuantity(pub f64);

/// Seam between fetched rows and the aggregation functions. Handlers feed
/// their DTOs in; tests feed in-memory fixtures.
pub trait Portion {
    /// Consumed amount in grams. Must be > 0.
    fn quantity_g(&self) -> f64;
    /// The linked food's per-100 g profile.
    fn nutrients(&self) -> NutrientProfile;
    fn meal_type(&self) -> Option<MealType>;
    fn eaten_at(&self) -> OffsetDateTime;
}

fn multiplier_for<T: Portion>(entry: &T) -> Result<f64, InvalidQuantity> {
    let quantity = entry.quantity_g();
    // `!(q > 0)` also rejects NaN.
    if !(quantity > 0.0) {
        return Err(InvalidQuantity(quantity));
    }
    Ok(quantity / 100.0)
}

/// Scale-and-accumulate every entry into one total. Commutative: entry order
/// never changes the result beyond float associativity.
pub fn aggregate<T: Portion>(entries: &[T]) -> Result<NutrientTotals, InvalidQuantity> {
    let mut totals = NutrientTotals::default();
    for entry in entries {
        let multiplier = multiplier_for(entry)?;
        totals.accumulate(&entry.nutrients(), multiplier);
    }
    Ok(totals)
}

#[derive(Debug, Serialize)]
pub struct MealsByType<T> {
    pub breakfast: Vec<T>,
    pub lunch: Vec<T>,
    pub dinner: Vec<T>,
    pub snack: Vec<T>,
    pub other: Vec<T>,
}

impl<T> Default for MealsByType<T> {
    fn default() -> Self {
        Self {
            breakfast: Vec::new(),
            lunch: Vec::new(),
            dinner: Vec::new(),
            snack: Vec::new(),
            other: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TypeBreakdown<T> {
    pub meals_by_type: MealsByType<T>,
    pub totals: NutrientTotals,
    pub total_entries: usize,
}

/// Partition entries by meal slot and compute the full-set totals.
pub fn aggregate_by_type<T: Portion>(entries: Vec<T>) -> Result<TypeBreakdown<T>, InvalidQuantity> {
    let totals = aggregate(&entries)?;
    let total_entries = entries.len();

    let mut meals_by_type = MealsByType::default();
    for entry in entries {
        match entry.meal_type() {
            Some(MealType::Breakfast) => meals_by_type.breakfast.push(entry),
            Some(MealType::Lunch) => meals_by_type.lunch.push(entry),
            Some(MealType::Dinner) => meals_by_type.dinner.push(entry),
            Some(MealType::Snack) => meals_by_type.snack.push(entry),
            None => meals_by_type.other.push(entry),
        }
    }

    Ok(TypeBreakdown { meals_by_type, totals, total_entries })
}

#[derive(Debug, Serialize)]
pub struct DailySummary {
    pub totals: NutrientTotals,
    pub total_entries: usize,
}

/// Totals for a single already-filtered day of entries.
pub fn aggregate_daily<T: Portion>(entries: &[T]) -> Result<DailySummary, InvalidQuantity> {
    Ok(DailySummary { totals: aggregate(entries)?, total_entries: entries.len() })
}

/// One calendar day's macro totals inside a weekly view or breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayNutrition {
    #[serde(with = "dates::iso")]
    pub date: Date,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub entries: usize,
}

impl DayNutrition {
    fn empty(date: Date) -> Self {
        Self { date, calories: 0.0, protein: 0.0, fat: 0.0, carbs: 0.0, entries: 0 }
    }

    fn accumulate(&mut self, food: &NutrientProfile, multiplier: f64) {
        self.calories += food.calories * multiplier;
        self.protein += food.protein * multiplier;
        self.fat += food.fat * multiplier;
        self.carbs += food.carbs * multiplier;
        self.entries += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeeklyTotals {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub entries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyAverages {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

#[derive(Debug, Serialize)]
pub struct WeeklySummary {
    #[serde(with = "dates::iso")]
    pub week_start: Date,
    #[serde(with = "dates::iso")]
    pub week_end: Date,
    pub daily_data: Vec<DayNutrition>,
    pub weekly_totals: WeeklyTotals,
    pub weekly_averages: WeeklyAverages,
    pub total_entries: usize,
}

/// Sunday-aligned week containing `reference`: the most recent Sunday at or
/// before it, through the following Saturday.
pub fn week_bounds(reference: Date) -> (Date, Date) {
    let days_from_sunday = i64::from(reference.weekday().number_days_from_sunday());
    let week_start = reference - Duration::days(days_from_sunday);
    (week_start, week_start + Duration::days(6))
}

/// Bucket entries into the 7 calendar days of the week containing
/// `reference`. Every day is present even with no entries; averages divide
/// by the fixed 7-day period, not by days with data. Entries outside the
/// window are ignored (callers filter the fetch to the same bounds).
pub fn aggregate_weekly<T: Portion>(
    entries: &[T],
    reference: Date,
) -> Result<WeeklySummary, InvalidQuantity> {
    let (week_start, week_end) = week_bounds(reference);

    let mut daily_data: Vec<DayNutrition> = (0..7)
        .map(|offset| DayNutrition::empty(week_start + Duration::days(offset)))
        .collect();

    for entry in entries {
        let multiplier = multiplier_for(entry)?;
        let date = entry.eaten_at().date();
        if let Some(day) = daily_data.iter_mut().find(|day| day.date == date) {
            day.accumulate(&entry.nutrients(), multiplier);
        }
    }

    let mut weekly_totals = WeeklyTotals::default();
    for day in &daily_data {
        weekly_totals.calories += day.calories;
        weekly_totals.protein += day.protein;
        weekly_totals.fat += day.fat;
        weekly_totals.carbs += day.carbs;
        weekly_totals.entries += day.entries;
    }

    let weekly_averages = WeeklyAverages {
        calories: weekly_totals.calories / 7.0,
        protein: weekly_totals.protein / 7.0,
        fat: weekly_totals.fat / 7.0,
        carbs: weekly_totals.carbs / 7.0,
    };

    let total_entries = weekly_totals.entries;
    Ok(WeeklySummary {
        week_start,
        week_end,
        daily_data,
        weekly_totals,
        weekly_averages,
        total_entries,
    })
}

/// Per-date macro breakdown over an arbitrary range, newest first. Only
/// dates that actually have entries appear.
pub fn daily_breakdown<T: Portion>(entries: &[T]) -> Result<Vec<DayNutrition>, InvalidQuantity> {
    let mut by_date: BTreeMap<Date, DayNutrition> = BTreeMap::new();
    for entry in entries {
        let multiplier = multiplier_for(entry)?;
        let date = entry.eaten_at().date();
        by_date
            .entry(date)
            .or_insert_with(|| DayNutrition::empty(date))
            .accumulate(&entry.nutrients(), multiplier);
    }
    Ok(by_date.into_values().rev().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    struct FixtureEntry {
        quantity: f64,
        food: NutrientProfile,
        meal_type: Option<MealType>,
        eaten_at: OffsetDateTime,
    }

    impl Portion for FixtureEntry {
        fn quantity_g(&self) -> f64 {
            self.quantity
        }
        fn nutrients(&self) -> NutrientProfile {
            self.food
        }
        fn meal_type(&self) -> Option<MealType> {
            self.meal_type
        }
        fn eaten_at(&self) -> OffsetDateTime {
            self.eaten_at
        }
    }

    fn chicken_breast() -> NutrientProfile {
        NutrientProfile { calories: 165.0, protein: 31.0, fat: 3.6, ..Default::default() }
    }

    fn brown_rice() -> NutrientProfile {
        NutrientProfile {
            calories: 112.0,
            protein: 2.6,
            fat: 0.9,
            carbs: 23.0,
            fiber: 1.8,
            ..Default::default()
        }
    }

    fn entry(
        quantity: f64,
        food: NutrientProfile,
        meal_type: Option<MealType>,
        eaten_at: OffsetDateTime,
    ) -> FixtureEntry {
        FixtureEntry { quantity, food, meal_type, eaten_at }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn single_entry_follows_the_scaling_law() {
        let entries = vec![entry(
            150.0,
            chicken_breast(),
            Some(MealType::Breakfast),
            datetime!(2024-03-04 08:30 UTC),
        )];
        let totals = aggregate(&entries).unwrap();
        assert!(close(totals.calories, 1.5 * 165.0));
        assert!(close(totals.protein, 1.5 * 31.0));
        assert!(close(totals.fat, 1.5 * 3.6));
        assert!(close(totals.carbs, 0.0));
    }

    #[test]
    fn aggregation_is_order_independent() {
        let at = datetime!(2024-03-04 12:00 UTC);
        let forward = vec![
            entry(150.0, chicken_breast(), None, at),
            entry(200.0, brown_rice(), None, at),
            entry(80.0, NutrientProfile { calories: 59.0, protein: 10.0, ..Default::default() }, None, at),
        ];
        let reversed = vec![
            entry(80.0, NutrientProfile { calories: 59.0, protein: 10.0, ..Default::default() }, None, at),
            entry(200.0, brown_rice(), None, at),
            entry(150.0, chicken_breast(), None, at),
        ];
        let a = aggregate(&forward).unwrap();
        let b = aggregate(&reversed).unwrap();
        assert!(close(a.calories, b.calories));
        assert!(close(a.protein, b.protein));
        assert!(close(a.carbs, b.carbs));
    }

    #[test]
    fn empty_input_yields_zero_totals() {
        let totals = aggregate::<FixtureEntry>(&[]).unwrap();
        assert_eq!(totals, NutrientTotals::default());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let at = datetime!(2024-03-04 12:00 UTC);
        assert!(aggregate(&[entry(0.0, chicken_breast(), None, at)]).is_err());
        assert!(aggregate(&[entry(-50.0, chicken_breast(), None, at)]).is_err());
        assert!(aggregate(&[entry(f64::NAN, chicken_breast(), None, at)]).is_err());
    }

    #[test]
    fn by_type_buckets_entries_and_defaults_to_other() {
        let at = datetime!(2024-03-04 12:00 UTC);
        let breakdown = aggregate_by_type(vec![
            entry(150.0, chicken_breast(), Some(MealType::Breakfast), at),
            entry(200.0, brown_rice(), Some(MealType::Lunch), at),
            entry(30.0, brown_rice(), None, at),
        ])
        .unwrap();

        assert_eq!(breakdown.meals_by_type.breakfast.len(), 1);
        assert_eq!(breakdown.meals_by_type.lunch.len(), 1);
        assert_eq!(breakdown.meals_by_type.dinner.len(), 0);
        assert_eq!(breakdown.meals_by_type.snack.len(), 0);
        assert_eq!(breakdown.meals_by_type.other.len(), 1);
        assert_eq!(breakdown.total_entries, 3);
    }

    #[test]
    fn chicken_and_rice_daily_example() {
        // 150 g chicken breast at breakfast, 200 g brown rice at lunch.
        let entries = vec![
            entry(150.0, chicken_breast(), Some(MealType::Breakfast), datetime!(2024-03-04 08:00 UTC)),
            entry(200.0, brown_rice(), Some(MealType::Lunch), datetime!(2024-03-04 13:00 UTC)),
        ];
        let summary = aggregate_daily(&entries).unwrap();
        assert!(close(summary.totals.calories, 247.5 + 224.0));
        assert!(close(summary.totals.protein, 46.5 + 5.2));
        assert_eq!(summary.total_entries, 2);

        let breakdown = aggregate_by_type(entries).unwrap();
        assert_eq!(breakdown.meals_by_type.breakfast.len(), 1);
        assert_eq!(breakdown.meals_by_type.lunch.len(), 1);
    }

    #[test]
    fn week_bounds_align_to_sunday() {
        // 2024-03-06 is a Wednesday; its week runs Sun 03-03 .. Sat 03-09.
        assert_eq!(week_bounds(date!(2024 - 03 - 06)), (date!(2024 - 03 - 03), date!(2024 - 03 - 09)));
        // A Sunday is its own week start.
        assert_eq!(week_bounds(date!(2024 - 03 - 03)), (date!(2024 - 03 - 03), date!(2024 - 03 - 09)));
        // A Saturday maps back to the previous Sunday.
        assert_eq!(week_bounds(date!(2024 - 03 - 09)), (date!(2024 - 03 - 03), date!(2024 - 03 - 09)));
    }

    #[test]
    fn weekly_always_yields_seven_buckets() {
        let summary = aggregate_weekly::<FixtureEntry>(&[], date!(2024 - 03 - 06)).unwrap();
        assert_eq!(summary.daily_data.len(), 7);
        assert_eq!(summary.daily_data[0].date, date!(2024 - 03 - 03));
        assert_eq!(summary.daily_data[6].date, date!(2024 - 03 - 09));
        assert!(summary.daily_data.iter().all(|day| day.entries == 0));
        assert_eq!(summary.total_entries, 0);
    }

    #[test]
    fn weekly_average_divides_by_seven_even_with_sparse_days() {
        // Only Monday has data: 100 g of chicken (165 kcal).
        let entries = vec![entry(
            100.0,
            chicken_breast(),
            Some(MealType::Dinner),
            datetime!(2024-03-04 19:00 UTC),
        )];
        let summary = aggregate_weekly(&entries, date!(2024 - 03 - 06)).unwrap();
        assert!(close(summary.weekly_totals.calories, 165.0));
        assert!(close(summary.weekly_averages.calories, 165.0 / 7.0));
        assert_eq!(summary.weekly_totals.entries, 1);
    }

    #[test]
    fn weekly_buckets_by_calendar_date() {
        let summary = aggregate_weekly(
            &[
                // Late-evening entry still lands on its own calendar day.
                entry(100.0, chicken_breast(), None, datetime!(2024-03-03 23:59:59 UTC)),
                entry(200.0, brown_rice(), None, datetime!(2024-03-09 00:00:00 UTC)),
            ],
            date!(2024 - 03 - 06),
        )
        .unwrap();
        assert!(close(summary.daily_data[0].calories, 165.0));
        assert!(close(summary.daily_data[6].calories, 224.0));
        assert_eq!(summary.total_entries, 2);
    }

    #[test]
    fn weekly_totals_equal_sum_of_day_buckets() {
        let entries = vec![
            entry(150.0, chicken_breast(), None, datetime!(2024-03-04 08:00 UTC)),
            entry(200.0, brown_rice(), None, datetime!(2024-03-05 13:00 UTC)),
            entry(50.0, brown_rice(), None, datetime!(2024-03-05 19:00 UTC)),
        ];
        let summary = aggregate_weekly(&entries, date!(2024 - 03 - 06)).unwrap();
        let summed: f64 = summary.daily_data.iter().map(|day| day.calories).sum();
        assert!(close(summary.weekly_totals.calories, summed));
    }

    #[test]
    fn breakdown_groups_by_date_newest_first() {
        let breakdown = daily_breakdown(&[
            entry(100.0, chicken_breast(), None, datetime!(2024-03-01 09:00 UTC)),
            entry(100.0, brown_rice(), None, datetime!(2024-03-03 09:00 UTC)),
            entry(100.0, brown_rice(), None, datetime!(2024-03-03 18:00 UTC)),
        ])
        .unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].date, date!(2024 - 03 - 03));
        assert_eq!(breakdown[0].entries, 2);
        assert_eq!(breakdown[1].date, date!(2024 - 03 - 01));
    }

    #[test]
    fn day_nutrition_serializes_iso_dates() {
        let day = DayNutrition::empty(date!(2024 - 03 - 03));
        let json = serde_json::to_value(day).unwrap();
        assert_eq!(json["date"], "2024-03-03");
    }
}
