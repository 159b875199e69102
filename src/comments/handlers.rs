use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::access;
use crate::auth::CurrentUser;
use crate::comments::dto::{
    CommentListResponse, CommentWithAuthor, CreateCommentRequest, ListCommentsQuery, RecentQuery,
    UpdateCommentRequest,
};
use crate::comments::repo::Comment;
use crate::error::ApiError;
use crate::meals::repo::MealEntry;
use crate::state::AppState;
use crate::users::repo::User;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/:id", put(update_comment).delete(delete_comment))
        .route("/comments/meal/:meal_entry_id", get(list_for_meal_entry))
        .route("/comments/user/:user_id", get(list_for_user))
        .route("/comments/nutritionist/:nutritionist_id/recent", get(recent_by_nutritionist))
}

const MAX_MESSAGE_LEN: usize = 1000;

fn validate_message(message: &str) -> Result<(), ApiError> {
    if message.is_empty() || message.len() > MAX_MESSAGE_LEN {
        return Err(ApiError::invalid("message must be 1-1000 characters"));
    }
    Ok(())
}

/// Resolve a meal entry and its owner's scope, 404-ing before any
/// permission decision.
async fn entry_owner_scope(
    state: &AppState,
    meal_entry_id: i64,
) -> Result<access::OwnerScope, ApiError> {
    let entry = MealEntry::find_by_id(&state.db, meal_entry_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("meal entry"))?;
    User::owner_scope(&state.db, entry.user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))
}

#[instrument(skip(state))]
pub async fn list_for_meal_entry(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(meal_entry_id): Path<i64>,
) -> Result<Json<Vec<CommentWithAuthor>>, ApiError> {
    let scope = entry_owner_scope(&state, meal_entry_id).await?;
    if !access::can_access_meal_entry(&actor, &scope) {
        return Err(ApiError::Forbidden);
    }

    let comments = Comment::list_for_meal_entry(&state.db, meal_entry_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(comments))
}

#[instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let target = User::owner_scope(&state.db, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("user"))?;
    if !access::can_access_user_data(&actor, &target) {
        return Err(ApiError::Forbidden);
    }

    let comments = Comment::list_for_user(
        &state.db,
        user_id,
        query.is_private,
        query.limit,
        query.offset,
    )
    .await
    .map_err(ApiError::Internal)?
    .into_iter()
    .map(Into::into)
    .collect();
    let total = Comment::count_for_user(&state.db, user_id, query.is_private)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(CommentListResponse { comments, total }))
}

#[instrument(skip(state, payload))]
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentWithAuthor>), ApiError> {
    validate_message(&payload.message)?;

    let scope = entry_owner_scope(&state, payload.meal_entry_id).await?;
    if !access::can_author_comment(&actor, &scope) {
        return Err(ApiError::Forbidden);
    }

    let comment = Comment::create(
        &state.db,
        payload.meal_entry_id,
        actor.id,
        &payload.message,
        payload.is_private,
    )
    .await
    .map_err(ApiError::Internal)?;

    let row = Comment::find_with_author(&state.db, comment.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("comment"))?;

    info!(comment_id = comment.id, meal_entry_id = payload.meal_entry_id, "comment created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentWithAuthor>, ApiError> {
    let existing = Comment::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("comment"))?;

    if !access::can_moderate_comment(&actor, existing.author_id) {
        return Err(ApiError::Forbidden);
    }
    validate_message(&payload.message)?;

    Comment::update(&state.db, id, &payload.message, payload.is_private)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("comment"))?;

    let row = Comment::find_with_author(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("comment"))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let existing = Comment::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("comment"))?;

    if !access::can_moderate_comment(&actor, existing.author_id) {
        return Err(ApiError::Forbidden);
    }

    Comment::delete(&state.db, id).await.map_err(ApiError::Internal)?;
    info!(comment_id = id, "comment deleted");
    Ok(Json(serde_json::json!({ "message": "comment deleted" })))
}

/// A nutritionist's latest comments across all their users; visible to the
/// author and admins.
#[instrument(skip(state))]
pub async fn recent_by_nutritionist(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(nutritionist_id): Path<i64>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<CommentListResponse>, ApiError> {
    if !access::is_self_or_admin(&actor, nutritionist_id) {
        return Err(ApiError::Forbidden);
    }

    let comments: Vec<_> = Comment::recent_by_author(&state.db, nutritionist_id, query.limit)
        .await
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = comments.len() as i64;

    Ok(Json(CommentListResponse { comments, total }))
}
