use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Where a food's nutrient data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "food_source", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FoodSource {
    Custom,
    Usda,
}

/// Catalog food with its per-100 g nutrient profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Food {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub vitamin_a: Option<f64>,
    pub vitamin_c: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
    pub source: FoodSource,
    pub usda_fdc_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const FOOD_COLUMNS: &str = "id, name, brand, description, calories, protein, fat, carbs, fiber, \
                            sugar, sodium, vitamin_a, vitamin_c, calcium, iron, source, \
                            usda_fdc_id, created_at";

/// Column values for an insert or full update.
#[derive(Debug)]
pub struct FoodRecord {
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub vitamin_a: Option<f64>,
    pub vitamin_c: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
}

impl Food {
    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Food>> {
        let food = sqlx::query_as::<_, Food>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(food)
    }

    pub async fn find_by_fdc_id(db: &PgPool, fdc_id: i64) -> anyhow::Result<Option<Food>> {
        let food = sqlx::query_as::<_, Food>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE usda_fdc_id = $1"
        ))
        .bind(fdc_id)
        .fetch_optional(db)
        .await?;
        Ok(food)
    }

    pub async fn list(
        db: &PgPool,
        search: Option<&str>,
        source: Option<FoodSource>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Food>> {
        let foods = sqlx::query_as::<_, Food>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods \
             WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' \
                    OR brand ILIKE '%' || $1 || '%' \
                    OR description ILIKE '%' || $1 || '%') \
               AND ($2::food_source IS NULL OR source = $2) \
             ORDER BY name ASC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(search)
        .bind(source)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(foods)
    }

    pub async fn count(
        db: &PgPool,
        search: Option<&str>,
        source: Option<FoodSource>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM foods \
             WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' \
                    OR brand ILIKE '%' || $1 || '%' \
                    OR description ILIKE '%' || $1 || '%') \
               AND ($2::food_source IS NULL OR source = $2)",
        )
        .bind(search)
        .bind(source)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn create(
        db: &PgPool,
        record: &FoodRecord,
        source: FoodSource,
        usda_fdc_id: Option<i64>,
    ) -> anyhow::Result<Food> {
        let food = sqlx::query_as::<_, Food>(&format!(
            "INSERT INTO foods (name, brand, description, calories, protein, fat, carbs, fiber, \
                                sugar, sodium, vitamin_a, vitamin_c, calcium, iron, source, usda_fdc_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {FOOD_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(record.brand.as_deref())
        .bind(record.description.as_deref())
        .bind(record.calories)
        .bind(record.protein)
        .bind(record.fat)
        .bind(record.carbs)
        .bind(record.fiber)
        .bind(record.sugar)
        .bind(record.sodium)
        .bind(record.vitamin_a)
        .bind(record.vitamin_c)
        .bind(record.calcium)
        .bind(record.iron)
        .bind(source)
        .bind(usda_fdc_id)
        .fetch_one(db)
        .await?;
        Ok(food)
    }

    pub async fn update(
        db: &PgPool,
        id: i64,
        record: &FoodRecord,
    ) -> anyhow::Result<Option<Food>> {
        let food = sqlx::query_as::<_, Food>(&format!(
            "UPDATE foods SET name = $2, brand = $3, description = $4, calories = $5, \
                 protein = $6, fat = $7, carbs = $8, fiber = $9, sugar = $10, sodium = $11, \
                 vitamin_a = $12, vitamin_c = $13, calcium = $14, iron = $15 \
             WHERE id = $1 RETURNING {FOOD_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(record.brand.as_deref())
        .bind(record.description.as_deref())
        .bind(record.calories)
        .bind(record.protein)
        .bind(record.fat)
        .bind(record.carbs)
        .bind(record.fiber)
        .bind(record.sugar)
        .bind(record.sodium)
        .bind(record.vitamin_a)
        .bind(record.vitamin_c)
        .bind(record.calcium)
        .bind(record.iron)
        .fetch_optional(db)
        .await?;
        Ok(food)
    }

    /// Number of meal entries referencing this food. Deletion is blocked
    /// while this is non-zero.
    pub async fn meal_entry_count(db: &PgPool, id: i64) -> anyhow::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM meal_entries WHERE food_id = $1")
                .bind(id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM foods WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
