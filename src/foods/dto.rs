use serde::{Deserialize, Serialize};

use crate::foods::repo::{Food, FoodRecord, FoodSource};
use crate::nutrition::NutrientProfile;

#[derive(Debug, Deserialize)]
pub struct ListFoodsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub search: Option<String>,
    pub source: Option<FoodSource>,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct FoodListResponse {
    pub foods: Vec<Food>,
    pub total: i64,
}

/// Create/update payload. Nutrients are per 100 g; unspecified core fields
/// default to zero.
#[derive(Debug, Deserialize)]
pub struct FoodPayload {
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
    pub vitamin_a: Option<f64>,
    pub vitamin_c: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
}

impl FoodPayload {
    pub fn into_record(self) -> FoodRecord {
        FoodRecord {
            name: self.name,
            brand: self.brand,
            description: self.description,
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbs: self.carbs,
            fiber: self.fiber,
            sugar: self.sugar,
            sodium: self.sodium,
            vitamin_a: self.vitamin_a,
            vitamin_c: self.vitamin_c,
            calcium: self.calcium,
            iron: self.iron,
        }
    }
}

/// USDA FoodData Central detail payload, as returned by their `/food/{id}`
/// endpoint. The HTTP fetch happens outside this service; clients post the
/// payload here for import.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdaFoodPayload {
    pub fdc_id: i64,
    pub description: String,
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub additional_descriptions: Vec<String>,
    #[serde(default)]
    pub food_nutrients: Vec<UsdaFoodNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdaFoodNutrient {
    pub nutrient: Option<UsdaNutrient>,
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdaNutrient {
    pub name: Option<String>,
}

/// Map USDA nutrient names onto the per-100 g profile. Unknown names are
/// skipped; absent values degrade to zero.
pub fn extract_usda_profile(nutrients: &[UsdaFoodNutrient]) -> NutrientProfile {
    let mut profile = NutrientProfile::default();
    for entry in nutrients {
        let Some(name) = entry.nutrient.as_ref().and_then(|n| n.name.as_deref()) else {
            continue;
        };
        let name = name.to_lowercase();
        let value = entry.amount.unwrap_or(0.0);

        if name.contains("energy") || name.contains("calorie") {
            profile.calories = value;
        } else if name.contains("protein") {
            profile.protein = value;
        } else if name.contains("total lipid") || name.contains("fat, total") {
            profile.fat = value;
        } else if name.contains("carbohydrate") {
            profile.carbs = value;
        } else if name.contains("fiber") {
            profile.fiber = value;
        } else if name.contains("sugars") {
            profile.sugar = value;
        } else if name.contains("sodium") {
            profile.sodium = value;
        }
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nutrient(name: &str, amount: f64) -> UsdaFoodNutrient {
        UsdaFoodNutrient {
            nutrient: Some(UsdaNutrient { name: Some(name.to_string()) }),
            amount: Some(amount),
        }
    }

    #[test]
    fn maps_usda_nutrient_names_onto_the_profile() {
        let profile = extract_usda_profile(&[
            nutrient("Energy", 165.0),
            nutrient("Protein", 31.0),
            nutrient("Total lipid (fat)", 3.6),
            nutrient("Carbohydrate, by difference", 0.0),
            nutrient("Fiber, total dietary", 0.0),
            nutrient("Sugars, total including NLEA", 0.0),
            nutrient("Sodium, Na", 74.0),
        ]);
        assert_eq!(profile.calories, 165.0);
        assert_eq!(profile.protein, 31.0);
        assert_eq!(profile.fat, 3.6);
        assert_eq!(profile.sodium, 74.0);
    }

    #[test]
    fn unknown_names_and_missing_amounts_are_tolerated() {
        let profile = extract_usda_profile(&[
            nutrient("Vitamin D (D2 + D3)", 1.0),
            UsdaFoodNutrient { nutrient: None, amount: Some(12.0) },
            UsdaFoodNutrient {
                nutrient: Some(UsdaNutrient { name: Some("Protein".into()) }),
                amount: None,
            },
        ]);
        assert_eq!(profile, NutrientProfile { protein: 0.0, ..Default::default() });
    }

    #[test]
    fn usda_payload_parses_camel_case() {
        let payload: UsdaFoodPayload = serde_json::from_str(
            r#"{
                "fdcId": 171077,
                "description": "Chicken, broiler, breast, grilled",
                "brandOwner": null,
                "foodNutrients": [
                    { "nutrient": { "name": "Energy" }, "amount": 165.0 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.fdc_id, 171077);
        assert_eq!(payload.food_nutrients.len(), 1);
    }
}
