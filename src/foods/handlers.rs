use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::access;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::foods::dto::{
    extract_usda_profile, FoodListResponse, FoodPayload, ListFoodsQuery, UsdaFoodPayload,
};
use crate::foods::repo::{Food, FoodRecord, FoodSource};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods).post(create_food))
        .route("/foods/:id", get(get_food).put(update_food).delete(delete_food))
        .route("/foods/import/usda", post(import_usda))
}

fn validate_payload(payload: &FoodPayload) -> Result<(), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::invalid("name must be 1-200 characters"));
    }
    if payload.brand.as_deref().is_some_and(|b| b.len() > 100) {
        return Err(ApiError::invalid("brand must be at most 100 characters"));
    }
    if payload.description.as_deref().is_some_and(|d| d.len() > 500) {
        return Err(ApiError::invalid("description must be at most 500 characters"));
    }
    let core = [
        ("calories", payload.calories),
        ("protein", payload.protein),
        ("fat", payload.fat),
        ("carbs", payload.carbs),
        ("fiber", payload.fiber),
        ("sugar", payload.sugar),
        ("sodium", payload.sodium),
    ];
    for (label, value) in core {
        if !(value >= 0.0) {
            return Err(ApiError::invalid(format!("{label} must be non-negative")));
        }
    }
    let micros = [
        ("vitamin_a", payload.vitamin_a),
        ("vitamin_c", payload.vitamin_c),
        ("calcium", payload.calcium),
        ("iron", payload.iron),
    ];
    for (label, value) in micros {
        if let Some(value) = value {
            if !(value >= 0.0) {
                return Err(ApiError::invalid(format!("{label} must be non-negative")));
            }
        }
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Query(query): Query<ListFoodsQuery>,
) -> Result<Json<FoodListResponse>, ApiError> {
    let search = query.search.as_deref();
    let foods = Food::list(&state.db, search, query.source, query.limit, query.offset)
        .await
        .map_err(ApiError::Internal)?;
    let total = Food::count(&state.db, search, query.source)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(FoodListResponse { foods, total }))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Food>, ApiError> {
    let food = Food::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("food"))?;
    Ok(Json(food))
}

#[instrument(skip(state, payload))]
pub async fn create_food(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<FoodPayload>,
) -> Result<(StatusCode, Json<Food>), ApiError> {
    if !access::can_manage_foods(&actor) {
        return Err(ApiError::Forbidden);
    }
    validate_payload(&payload)?;

    let food = Food::create(&state.db, &payload.into_record(), FoodSource::Custom, None)
        .await
        .map_err(ApiError::Internal)?;

    info!(food_id = food.id, "food created");
    Ok((StatusCode::CREATED, Json(food)))
}

#[instrument(skip(state, payload))]
pub async fn update_food(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<FoodPayload>,
) -> Result<Json<Food>, ApiError> {
    if !access::can_manage_foods(&actor) {
        return Err(ApiError::Forbidden);
    }
    validate_payload(&payload)?;

    let food = Food::update(&state.db, id, &payload.into_record())
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("food"))?;
    Ok(Json(food))
}

/// Admin-only; refused while any meal entry still references the food.
#[instrument(skip(state))]
pub async fn delete_food(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden);
    }

    Food::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("food"))?;

    let references = Food::meal_entry_count(&state.db, id)
        .await
        .map_err(ApiError::Internal)?;
    if references > 0 {
        return Err(ApiError::Conflict(
            "cannot delete a food that is used in meal entries".into(),
        ));
    }

    Food::delete(&state.db, id).await.map_err(ApiError::Internal)?;
    info!(food_id = id, "food deleted");
    Ok(Json(serde_json::json!({ "message": "food deleted" })))
}

/// Import an already-fetched USDA FoodData Central payload. Re-importing an
/// fdc id returns the existing row instead of duplicating it.
#[instrument(skip(state, payload))]
pub async fn import_usda(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<UsdaFoodPayload>,
) -> Result<(StatusCode, Json<Food>), ApiError> {
    if !access::can_manage_foods(&actor) {
        return Err(ApiError::Forbidden);
    }

    if let Some(existing) = Food::find_by_fdc_id(&state.db, payload.fdc_id)
        .await
        .map_err(ApiError::Internal)?
    {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let profile = extract_usda_profile(&payload.food_nutrients);
    let description = if payload.additional_descriptions.is_empty() {
        None
    } else {
        Some(payload.additional_descriptions.join(", "))
    };
    let record = FoodRecord {
        name: payload.description,
        brand: payload.brand_owner,
        description,
        calories: profile.calories,
        protein: profile.protein,
        fat: profile.fat,
        carbs: profile.carbs,
        fiber: profile.fiber,
        sugar: profile.sugar,
        sodium: profile.sodium,
        vitamin_a: None,
        vitamin_c: None,
        calcium: None,
        iron: None,
    };

    let food = Food::create(&state.db, &record, FoodSource::Usda, Some(payload.fdc_id))
        .await
        .map_err(ApiError::Internal)?;

    info!(food_id = food.id, fdc_id = payload.fdc_id, "usda food imported");
    Ok((StatusCode::CREATED, Json(food)))
}
