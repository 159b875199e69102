use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::comments::dto::CommentWithAuthor;
use crate::meals::repo::MealEntryFoodRow;
use crate::nutrition::{
    MealType, MealsByType, NutrientProfile, NutrientTotals, Portion,
};

#[derive(Debug, Deserialize)]
pub struct ListMealsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub meal_type: Option<MealType>,
}

fn default_limit() -> i64 {
    20
}

/// The slice of a food that listing and summary endpoints expose.
#[derive(Debug, Clone, Serialize)]
pub struct FoodSummary {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

/// Meal entry with its food nested, as served to clients and fed to the
/// aggregation engine.
#[derive(Debug, Clone, Serialize)]
pub struct MealEntryWithFood {
    pub id: i64,
    pub user_id: i64,
    pub quantity: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub food: FoodSummary,
}

impl From<MealEntryFoodRow> for MealEntryWithFood {
    fn from(row: MealEntryFoodRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            quantity: row.quantity,
            eaten_at: row.eaten_at,
            meal_type: row.meal_type,
            notes: row.notes,
            created_at: row.created_at,
            food: FoodSummary {
                id: row.food_id,
                name: row.food_name,
                brand: row.food_brand,
                calories: row.food_calories,
                protein: row.food_protein,
                fat: row.food_fat,
                carbs: row.food_carbs,
                fiber: row.food_fiber,
                sugar: row.food_sugar,
                sodium: row.food_sodium,
            },
        }
    }
}

impl Portion for MealEntryWithFood {
    fn quantity_g(&self) -> f64 {
        self.quantity
    }

    fn nutrients(&self) -> NutrientProfile {
        NutrientProfile {
            calories: self.food.calories,
            protein: self.food.protein,
            fat: self.food.fat,
            carbs: self.food.carbs,
            fiber: self.food.fiber,
            sugar: self.food.sugar,
            sodium: self.food.sodium,
        }
    }

    fn meal_type(&self) -> Option<MealType> {
        self.meal_type
    }

    fn eaten_at(&self) -> OffsetDateTime {
        self.eaten_at
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub food_id: i64,
    pub quantity: f64,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub eaten_at: Option<OffsetDateTime>,
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMealRequest {
    pub quantity: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub eaten_at: Option<OffsetDateTime>,
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
}

/// Owner reference nested into the meal entry detail view.
#[derive(Debug, Serialize)]
pub struct MealOwner {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MealEntryDetails {
    #[serde(flatten)]
    pub entry: MealEntryWithFood,
    pub user: MealOwner,
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Debug, Serialize)]
pub struct MealListResponse {
    pub meal_entries: Vec<MealEntryWithFood>,
    /// Totals for this page of entries.
    pub nutrition_totals: NutrientTotals,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    pub date: String,
    pub totals: NutrientTotals,
    pub meals_by_type: MealsByType<MealEntryWithFood>,
    pub total_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row() -> MealEntryFoodRow {
        MealEntryFoodRow {
            id: 10,
            user_id: 1,
            food_id: 3,
            quantity: 150.0,
            eaten_at: datetime!(2024-03-04 08:30 UTC),
            meal_type: Some(MealType::Breakfast),
            notes: None,
            created_at: datetime!(2024-03-04 08:31 UTC),
            food_name: "Chicken Breast (Cooked)".into(),
            food_brand: None,
            food_calories: 165.0,
            food_protein: 31.0,
            food_fat: 3.6,
            food_carbs: 0.0,
            food_fiber: 0.0,
            food_sugar: 0.0,
            food_sodium: 74.0,
        }
    }

    #[test]
    fn row_nests_food_and_feeds_the_engine() {
        let dto = MealEntryWithFood::from(row());
        assert_eq!(dto.food.name, "Chicken Breast (Cooked)");
        assert_eq!(dto.quantity_g(), 150.0);
        assert_eq!(dto.nutrients().calories, 165.0);
        assert_eq!(dto.meal_type(), Some(MealType::Breakfast));
    }

    #[test]
    fn dto_serializes_meal_type_lowercase_and_rfc3339_timestamps() {
        let json = serde_json::to_value(MealEntryWithFood::from(row())).unwrap();
        assert_eq!(json["meal_type"], "breakfast");
        assert_eq!(json["food"]["calories"], 165.0);
        assert!(json["eaten_at"].as_str().unwrap().starts_with("2024-03-04T08:30:00"));
    }
}
