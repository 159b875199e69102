use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::access::Role;
use crate::nutrition::MealType;

/// Nutritionist/admin note attached to a meal entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub meal_entry_id: i64,
    pub author_id: i64,
    pub message: String,
    pub is_private: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Comment joined with its author's public columns.
#[derive(Debug, FromRow)]
pub struct CommentAuthorRow {
    pub id: i64,
    pub meal_entry_id: i64,
    pub author_id: i64,
    pub message: String,
    pub is_private: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub author_name: String,
    pub author_role: Role,
}

/// Comment joined with its author and the meal entry it annotates.
#[derive(Debug, FromRow)]
pub struct CommentFeedRow {
    pub id: i64,
    pub meal_entry_id: i64,
    pub author_id: i64,
    pub message: String,
    pub is_private: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub author_name: String,
    pub author_role: Role,
    pub entry_eaten_at: OffsetDateTime,
    pub entry_meal_type: Option<MealType>,
    pub entry_user_id: i64,
    pub entry_user_name: String,
    pub food_name: String,
}

const AUTHOR_COLUMNS: &str =
    "c.id, c.meal_entry_id, c.author_id, c.message, c.is_private, c.created_at, c.updated_at, \
     a.name AS author_name, a.role AS author_role";

const FEED_COLUMNS: &str =
    "c.id, c.meal_entry_id, c.author_id, c.message, c.is_private, c.created_at, c.updated_at, \
     a.name AS author_name, a.role AS author_role, \
     m.eaten_at AS entry_eaten_at, m.meal_type AS entry_meal_type, \
     u.id AS entry_user_id, u.name AS entry_user_name, f.name AS food_name";

const FEED_JOINS: &str = "FROM comments c \
     JOIN users a ON a.id = c.author_id \
     JOIN meal_entries m ON m.id = c.meal_entry_id \
     JOIN users u ON u.id = m.user_id \
     JOIN foods f ON f.id = m.food_id";

impl Comment {
    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, meal_entry_id, author_id, message, is_private, created_at, updated_at \
             FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(comment)
    }

    pub async fn find_with_author(
        db: &PgPool,
        id: i64,
    ) -> anyhow::Result<Option<CommentAuthorRow>> {
        let row = sqlx::query_as::<_, CommentAuthorRow>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM comments c \
             JOIN users a ON a.id = c.author_id WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn list_for_meal_entry(
        db: &PgPool,
        meal_entry_id: i64,
    ) -> anyhow::Result<Vec<super::dto::CommentWithAuthor>> {
        let rows = sqlx::query_as::<_, CommentAuthorRow>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM comments c \
             JOIN users a ON a.id = c.author_id \
             WHERE c.meal_entry_id = $1 \
             ORDER BY c.created_at DESC"
        ))
        .bind(meal_entry_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All comments across one user's meal entries, newest first.
    pub async fn list_for_user(
        db: &PgPool,
        user_id: i64,
        is_private: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<CommentFeedRow>> {
        let rows = sqlx::query_as::<_, CommentFeedRow>(&format!(
            "SELECT {FEED_COLUMNS} {FEED_JOINS} \
             WHERE m.user_id = $1 \
               AND ($2::boolean IS NULL OR c.is_private = $2) \
             ORDER BY c.created_at DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(is_private)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_user(
        db: &PgPool,
        user_id: i64,
        is_private: Option<bool>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments c \
             JOIN meal_entries m ON m.id = c.meal_entry_id \
             WHERE m.user_id = $1 \
               AND ($2::boolean IS NULL OR c.is_private = $2)",
        )
        .bind(user_id)
        .bind(is_private)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn recent_by_author(
        db: &PgPool,
        author_id: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<CommentFeedRow>> {
        let rows = sqlx::query_as::<_, CommentFeedRow>(&format!(
            "SELECT {FEED_COLUMNS} {FEED_JOINS} \
             WHERE c.author_id = $1 \
             ORDER BY c.created_at DESC \
             LIMIT $2"
        ))
        .bind(author_id)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        meal_entry_id: i64,
        author_id: i64,
        message: &str,
        is_private: bool,
    ) -> anyhow::Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (meal_entry_id, author_id, message, is_private) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, meal_entry_id, author_id, message, is_private, created_at, updated_at",
        )
        .bind(meal_entry_id)
        .bind(author_id)
        .bind(message)
        .bind(is_private)
        .fetch_one(db)
        .await?;
        Ok(comment)
    }

    pub async fn update(
        db: &PgPool,
        id: i64,
        message: &str,
        is_private: Option<bool>,
    ) -> anyhow::Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET message = $2, is_private = COALESCE($3, is_private), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, meal_entry_id, author_id, message, is_private, created_at, updated_at",
        )
        .bind(id)
        .bind(message)
        .bind(is_private)
        .fetch_optional(db)
        .await?;
        Ok(comment)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
