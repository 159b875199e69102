use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::access::{self, OwnerScope};
use crate::auth::CurrentUser;
use crate::dates::parse_iso_date;
use crate::error::ApiError;
use crate::meals::dto::MealEntryWithFood;
use crate::meals::repo::MealEntry;
use crate::nutrition;
use crate::state::AppState;
use crate::users::dto::{
    AssignNutritionistRequest, ListUsersQuery, NutritionSummaryResponse, NutritionistRef,
    SummaryQuery, UpdateProfileRequest, UserDetails, UserListResponse, UserSummary,
};
use crate::users::repo::{ProfilePatch, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_profile).delete(delete_user))
        .route("/users/:id/assign-nutritionist", put(assign_nutritionist))
        .route("/users/:id/nutrition-summary", get(nutrition_summary))
}

fn scope_of(user: &User) -> OwnerScope {
    OwnerScope { user_id: user.id, assigned_nutritionist_id: user.assigned_nutritionist_id }
}

async fn nutritionist_ref(
    state: &AppState,
    id: Option<i64>,
) -> Result<Option<NutritionistRef>, ApiError> {
    let Some(id) = id else { return Ok(None) };
    let user = User::find_by_id(&state.db, id).await.map_err(ApiError::Internal)?;
    Ok(user.map(|n| NutritionistRef { id: n.id, name: n.name, email: n.email }))
}

/// Nutritionists see their assigned users (plus themselves); admins see
/// everyone.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    if !access::can_list_users(&actor) {
        return Err(ApiError::Forbidden);
    }

    let scope = actor.is_nutritionist().then_some(actor.id);
    let search = query.search.as_deref();
    let users = User::list(&state.db, scope, query.role, search, query.limit, query.offset)
        .await
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    let total = User::count(&state.db, scope, query.role, search)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(UserListResponse { users, total }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<UserDetails>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;

    if !access::can_access_user_data(&actor, &scope_of(&user)) {
        return Err(ApiError::Forbidden);
    }

    let assigned_nutritionist = nutritionist_ref(&state, user.assigned_nutritionist_id).await?;
    Ok(Json(UserDetails { user, assigned_nutritionist }))
}

/// Profile fields only; role and email never change through this path.
#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserDetails>, ApiError> {
    let existing = User::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;

    if !access::can_mutate_record(&actor, existing.id) {
        return Err(ApiError::Forbidden);
    }

    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::invalid("name must not be empty"));
        }
    }
    for (label, value) in [("height", payload.height), ("weight", payload.weight)] {
        if let Some(value) = value {
            if !(value > 0.0) {
                return Err(ApiError::invalid(format!("{label} must be positive")));
            }
        }
    }

    let patch = ProfilePatch {
        name: payload.name.map(|n| n.trim().to_string()),
        date_of_birth: payload.date_of_birth,
        height: payload.height,
        weight: payload.weight,
        gender: payload.gender,
        activity_level: payload.activity_level,
        goals: payload.goals,
    };

    let user = User::update_profile(&state.db, id, &patch)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;

    let assigned_nutritionist = nutritionist_ref(&state, user.assigned_nutritionist_id).await?;
    Ok(Json(UserDetails { user, assigned_nutritionist }))
}

/// Admin-only: link a user to a nutritionist, or unlink with a null id.
#[instrument(skip(state))]
pub async fn assign_nutritionist(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AssignNutritionistRequest>,
) -> Result<Json<UserDetails>, ApiError> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden);
    }

    if let Some(nutritionist_id) = payload.nutritionist_id {
        User::find_nutritionist(&state.db, nutritionist_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::invalid("invalid nutritionist id"))?;
    }

    let user = User::assign_nutritionist(&state.db, id, payload.nutritionist_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;

    info!(user_id = user.id, nutritionist_id = ?payload.nutritionist_id, "nutritionist assigned");
    let assigned_nutritionist = nutritionist_ref(&state, user.assigned_nutritionist_id).await?;
    Ok(Json(UserDetails { user, assigned_nutritionist }))
}

/// Full-range nutrition totals plus a per-day breakdown, optionally
/// restricted to a start/end date window.
#[instrument(skip(state))]
pub async fn nutrition_summary(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<NutritionSummaryResponse>, ApiError> {
    let target = User::owner_scope(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;

    if !access::can_access_user_data(&actor, &target) {
        return Err(ApiError::Forbidden);
    }

    let start = query
        .start_date
        .as_deref()
        .map(parse_iso_date)
        .transpose()
        .map_err(|_| ApiError::invalid("start_date must be YYYY-MM-DD"))?
        .map(|d| d.midnight().assume_utc());
    let end = query
        .end_date
        .as_deref()
        .map(parse_iso_date)
        .transpose()
        .map_err(|_| ApiError::invalid("end_date must be YYYY-MM-DD"))?
        .map(|d| {
            d.next_day()
                .map(|next| next.midnight().assume_utc())
                .unwrap_or_else(|| d.midnight().assume_utc())
        });

    let entries: Vec<MealEntryWithFood> =
        MealEntry::list_with_food_in_range(&state.db, id, start, end)
            .await
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(MealEntryWithFood::from)
            .collect();

    let summary = nutrition::aggregate(&entries)?;
    let daily_breakdown = nutrition::daily_breakdown(&entries)?;
    let total_entries = entries.len();

    Ok(Json(NutritionSummaryResponse { summary, daily_breakdown, total_entries }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden);
    }

    if !User::delete(&state.db, id).await.map_err(ApiError::Internal)? {
        return Err(ApiError::NotFound("user"));
    }

    info!(user_id = id, "user deleted");
    Ok(Json(serde_json::json!({ "message": "user deleted" })))
}
