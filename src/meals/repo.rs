use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::nutrition::MealType;

/// Meal entry as stored: a quantity of one food eaten at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealEntry {
    pub id: i64,
    pub user_id: i64,
    pub food_id: i64,
    pub quantity: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Entry joined with the core nutrient columns of its food. The DTO layer
/// nests the aliased food columns back into an object.
#[derive(Debug, Clone, FromRow)]
pub struct MealEntryFoodRow {
    pub id: i64,
    pub user_id: i64,
    pub food_id: i64,
    pub quantity: f64,
    pub eaten_at: OffsetDateTime,
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub food_name: String,
    pub food_brand: Option<String>,
    pub food_calories: f64,
    pub food_protein: f64,
    pub food_fat: f64,
    pub food_carbs: f64,
    pub food_fiber: f64,
    pub food_sugar: f64,
    pub food_sodium: f64,
}

const JOINED_COLUMNS: &str =
    "m.id, m.user_id, m.food_id, m.quantity, m.eaten_at, m.meal_type, m.notes, m.created_at, \
     f.name AS food_name, f.brand AS food_brand, f.calories AS food_calories, \
     f.protein AS food_protein, f.fat AS food_fat, f.carbs AS food_carbs, \
     f.fiber AS food_fiber, f.sugar AS food_sugar, f.sodium AS food_sodium";

/// Optional fields accepted by `update`; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct MealEntryPatch {
    pub quantity: Option<f64>,
    pub eaten_at: Option<OffsetDateTime>,
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
}

impl MealEntry {
    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<MealEntry>> {
        let entry = sqlx::query_as::<_, MealEntry>(
            "SELECT id, user_id, food_id, quantity, eaten_at, meal_type, notes, created_at \
             FROM meal_entries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(entry)
    }

    pub async fn find_with_food(db: &PgPool, id: i64) -> anyhow::Result<Option<MealEntryFoodRow>> {
        let row = sqlx::query_as::<_, MealEntryFoodRow>(&format!(
            "SELECT {JOINED_COLUMNS} FROM meal_entries m \
             JOIN foods f ON f.id = m.food_id WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Paginated listing with optional time-window and meal-type filters,
    /// newest first.
    pub async fn list_with_food(
        db: &PgPool,
        user_id: i64,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
        meal_type: Option<MealType>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealEntryFoodRow>> {
        let rows = sqlx::query_as::<_, MealEntryFoodRow>(&format!(
            "SELECT {JOINED_COLUMNS} FROM meal_entries m \
             JOIN foods f ON f.id = m.food_id \
             WHERE m.user_id = $1 \
               AND ($2::timestamptz IS NULL OR m.eaten_at >= $2) \
               AND ($3::timestamptz IS NULL OR m.eaten_at < $3) \
               AND ($4::meal_type IS NULL OR m.meal_type = $4) \
             ORDER BY m.eaten_at DESC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(meal_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(
        db: &PgPool,
        user_id: i64,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
        meal_type: Option<MealType>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM meal_entries m \
             WHERE m.user_id = $1 \
               AND ($2::timestamptz IS NULL OR m.eaten_at >= $2) \
               AND ($3::timestamptz IS NULL OR m.eaten_at < $3) \
               AND ($4::meal_type IS NULL OR m.meal_type = $4)",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(meal_type)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    /// Unpaginated range fetch for summary aggregation, oldest first.
    pub async fn list_with_food_in_range(
        db: &PgPool,
        user_id: i64,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> anyhow::Result<Vec<MealEntryFoodRow>> {
        let rows = sqlx::query_as::<_, MealEntryFoodRow>(&format!(
            "SELECT {JOINED_COLUMNS} FROM meal_entries m \
             JOIN foods f ON f.id = m.food_id \
             WHERE m.user_id = $1 \
               AND ($2::timestamptz IS NULL OR m.eaten_at >= $2) \
               AND ($3::timestamptz IS NULL OR m.eaten_at < $3) \
             ORDER BY m.eaten_at ASC"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        user_id: i64,
        food_id: i64,
        quantity: f64,
        eaten_at: OffsetDateTime,
        meal_type: Option<MealType>,
        notes: Option<&str>,
    ) -> anyhow::Result<MealEntry> {
        let entry = sqlx::query_as::<_, MealEntry>(
            "INSERT INTO meal_entries (user_id, food_id, quantity, eaten_at, meal_type, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, food_id, quantity, eaten_at, meal_type, notes, created_at",
        )
        .bind(user_id)
        .bind(food_id)
        .bind(quantity)
        .bind(eaten_at)
        .bind(meal_type)
        .bind(notes)
        .fetch_one(db)
        .await?;
        Ok(entry)
    }

    pub async fn update(
        db: &PgPool,
        id: i64,
        patch: &MealEntryPatch,
    ) -> anyhow::Result<Option<MealEntry>> {
        let entry = sqlx::query_as::<_, MealEntry>(
            "UPDATE meal_entries SET \
                 quantity = COALESCE($2, quantity), \
                 eaten_at = COALESCE($3, eaten_at), \
                 meal_type = COALESCE($4, meal_type), \
                 notes = COALESCE($5, notes) \
             WHERE id = $1 \
             RETURNING id, user_id, food_id, quantity, eaten_at, meal_type, notes, created_at",
        )
        .bind(id)
        .bind(patch.quantity)
        .bind(patch.eaten_at)
        .bind(patch.meal_type)
        .bind(patch.notes.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(entry)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM meal_entries WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
