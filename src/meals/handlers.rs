use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::{Date, OffsetDateTime};
use tracing::{info, instrument};

use crate::access::{self, Actor, OwnerScope};
use crate::auth::CurrentUser;
use crate::comments::repo::Comment;
use crate::dates::{format_iso_date, parse_iso_date};
use crate::error::ApiError;
use crate::foods::repo::Food;
use crate::meals::dto::{
    CreateMealRequest, DailySummaryResponse, ListMealsQuery, MealEntryDetails, MealEntryWithFood,
    MealListResponse, MealOwner, UpdateMealRequest,
};
use crate::meals::repo::{MealEntry, MealEntryPatch};
use crate::nutrition::{self, WeeklySummary};
use crate::state::AppState;
use crate::users::repo::User;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/meals/:id", get(get_meal).put(update_meal).delete(delete_meal))
        .route("/meals/user/:user_id", get(list_user_meals))
        .route("/meals/user/:user_id/daily/:date", get(daily_summary))
        .route("/meals/user/:user_id/weekly", get(weekly_summary))
}

const MAX_NOTES_LEN: usize = 500;

fn day_window(date: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = date.midnight().assume_utc();
    let end = date
        .next_day()
        .map(|next| next.midnight().assume_utc())
        .unwrap_or(start);
    (start, end)
}

fn parse_date_param(raw: &str, label: &str) -> Result<Date, ApiError> {
    parse_iso_date(raw).map_err(|_| ApiError::invalid(format!("{label} must be YYYY-MM-DD")))
}

/// Resolve the target user's scope (404) and check read access (403), in
/// that order.
async fn authorize_user_read(
    state: &AppState,
    actor: &Actor,
    user_id: i64,
) -> Result<(), ApiError> {
    let target = User::owner_scope(&state.db, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;
    if !access::can_access_user_data(actor, &target) {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_user_meals(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
    Query(query): Query<ListMealsQuery>,
) -> Result<Json<MealListResponse>, ApiError> {
    authorize_user_read(&state, &actor, user_id).await?;

    let start = query
        .start_date
        .as_deref()
        .map(|raw| parse_date_param(raw, "start_date"))
        .transpose()?
        .map(|d| d.midnight().assume_utc());
    let end = query
        .end_date
        .as_deref()
        .map(|raw| parse_date_param(raw, "end_date"))
        .transpose()?
        .map(|d| day_window(d).1);

    let entries: Vec<MealEntryWithFood> = MealEntry::list_with_food(
        &state.db,
        user_id,
        start,
        end,
        query.meal_type,
        query.limit,
        query.offset,
    )
    .await
    .map_err(ApiError::Internal)?
    .into_iter()
    .map(MealEntryWithFood::from)
    .collect();

    let total = MealEntry::count(&state.db, user_id, start, end, query.meal_type)
        .await
        .map_err(ApiError::Internal)?;
    let nutrition_totals = nutrition::aggregate(&entries)?;

    Ok(Json(MealListResponse { meal_entries: entries, nutrition_totals, total }))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MealEntryDetails>, ApiError> {
    // The entry must be resolved before any permission decision: its owner
    // determines who may see it.
    let row = MealEntry::find_with_food(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;

    let owner = User::find_by_id(&state.db, row.user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;
    let scope = OwnerScope {
        user_id: owner.id,
        assigned_nutritionist_id: owner.assigned_nutritionist_id,
    };
    if !access::can_access_meal_entry(&actor, &scope) {
        return Err(ApiError::Forbidden);
    }

    let comments = Comment::list_for_meal_entry(&state.db, id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(MealEntryDetails {
        entry: MealEntryWithFood::from(row),
        user: MealOwner { id: owner.id, name: owner.name, email: owner.email },
        comments,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<CreateMealRequest>,
) -> Result<(StatusCode, Json<MealEntryWithFood>), ApiError> {
    if !(payload.quantity > 0.0) {
        return Err(ApiError::invalid("quantity must be a positive number of grams"));
    }
    if payload.notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(ApiError::invalid("notes must be at most 500 characters"));
    }

    Food::find_by_id(&state.db, payload.food_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("food"))?;

    let eaten_at = payload.eaten_at.unwrap_or_else(OffsetDateTime::now_utc);
    let entry = MealEntry::create(
        &state.db,
        actor.id,
        payload.food_id,
        payload.quantity,
        eaten_at,
        payload.meal_type,
        payload.notes.as_deref(),
    )
    .await
    .map_err(ApiError::Internal)?;

    let row = MealEntry::find_with_food(&state.db, entry.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;

    info!(entry_id = entry.id, user_id = actor.id, "meal entry created");
    Ok((StatusCode::CREATED, Json(MealEntryWithFood::from(row))))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMealRequest>,
) -> Result<Json<MealEntryWithFood>, ApiError> {
    let existing = MealEntry::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;

    if !access::can_mutate_record(&actor, existing.user_id) {
        return Err(ApiError::Forbidden);
    }

    if let Some(quantity) = payload.quantity {
        if !(quantity > 0.0) {
            return Err(ApiError::invalid("quantity must be a positive number of grams"));
        }
    }
    if payload.notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(ApiError::invalid("notes must be at most 500 characters"));
    }

    let patch = MealEntryPatch {
        quantity: payload.quantity,
        eaten_at: payload.eaten_at,
        meal_type: payload.meal_type,
        notes: payload.notes,
    };
    MealEntry::update(&state.db, id, &patch)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;

    let row = MealEntry::find_with_food(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;
    Ok(Json(MealEntryWithFood::from(row)))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let existing = MealEntry::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;

    if !access::can_mutate_record(&actor, existing.user_id) {
        return Err(ApiError::Forbidden);
    }

    MealEntry::delete(&state.db, id).await.map_err(ApiError::Internal)?;
    info!(entry_id = id, "meal entry deleted");
    Ok(Json(serde_json::json!({ "message": "meal entry deleted" })))
}

/// One day's entries bucketed by meal type, with full-day totals.
#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, date)): Path<(i64, String)>,
) -> Result<Json<DailySummaryResponse>, ApiError> {
    authorize_user_read(&state, &actor, user_id).await?;

    let date = parse_date_param(&date, "date")?;
    let (start, end) = day_window(date);

    let entries: Vec<MealEntryWithFood> =
        MealEntry::list_with_food_in_range(&state.db, user_id, Some(start), Some(end))
            .await
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(MealEntryWithFood::from)
            .collect();

    let summary = nutrition::aggregate_daily(&entries)?;
    let breakdown = nutrition::aggregate_by_type(entries)?;

    Ok(Json(DailySummaryResponse {
        date: format_iso_date(date),
        totals: summary.totals,
        meals_by_type: breakdown.meals_by_type,
        total_entries: summary.total_entries,
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct WeeklyQuery {
    pub start_date: Option<String>,
}

/// Sunday-through-Saturday view of the week containing `start_date`
/// (default: today). Days without entries still appear, zeroed.
#[instrument(skip(state))]
pub async fn weekly_summary(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
    Query(query): Query<WeeklyQuery>,
) -> Result<Json<WeeklySummary>, ApiError> {
    authorize_user_read(&state, &actor, user_id).await?;

    let reference = match query.start_date.as_deref() {
        Some(raw) => parse_date_param(raw, "start_date")?,
        None => OffsetDateTime::now_utc().date(),
    };
    let (week_start, week_end) = nutrition::week_bounds(reference);
    let start = week_start.midnight().assume_utc();
    let end = day_window(week_end).1;

    let entries: Vec<MealEntryWithFood> =
        MealEntry::list_with_food_in_range(&state.db, user_id, Some(start), Some(end))
            .await
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(MealEntryWithFood::from)
            .collect();

    let summary = nutrition::aggregate_weekly(&entries, reference)?;
    Ok(Json(summary))
}
