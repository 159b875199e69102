use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::access::Role;
use crate::comments::repo::{CommentAuthorRow, CommentFeedRow};
use crate::nutrition::MealType;

#[derive(Debug, Serialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

/// Comment with its author nested, as shown under a meal entry.
#[derive(Debug, Serialize)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub meal_entry_id: i64,
    pub message: String,
    pub is_private: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub author: CommentAuthor,
}

impl From<CommentAuthorRow> for CommentWithAuthor {
    fn from(row: CommentAuthorRow) -> Self {
        Self {
            id: row.id,
            meal_entry_id: row.meal_entry_id,
            message: row.message,
            is_private: row.is_private,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: CommentAuthor {
                id: row.author_id,
                name: row.author_name,
                role: row.author_role,
            },
        }
    }
}

/// Reference to the annotated meal entry in feed-style listings.
#[derive(Debug, Serialize)]
pub struct CommentedEntry {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub meal_type: Option<MealType>,
    pub user_id: i64,
    pub user_name: String,
    pub food_name: String,
}

#[derive(Debug, Serialize)]
pub struct CommentFeedItem {
    pub id: i64,
    pub message: String,
    pub is_private: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub author: CommentAuthor,
    pub meal_entry: CommentedEntry,
}

impl From<CommentFeedRow> for CommentFeedItem {
    fn from(row: CommentFeedRow) -> Self {
        Self {
            id: row.id,
            message: row.message,
            is_private: row.is_private,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: CommentAuthor {
                id: row.author_id,
                name: row.author_name,
                role: row.author_role,
            },
            meal_entry: CommentedEntry {
                id: row.meal_entry_id,
                eaten_at: row.entry_eaten_at,
                meal_type: row.entry_meal_type,
                user_id: row.entry_user_id,
                user_name: row.entry_user_name,
                food_name: row.food_name,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub meal_entry_id: i64,
    pub message: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub message: String,
    pub is_private: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub is_private: Option<bool>,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentFeedItem>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn feed_item_nests_author_and_entry() {
        let row = CommentFeedRow {
            id: 5,
            meal_entry_id: 10,
            author_id: 7,
            message: "More fiber at breakfast".into(),
            is_private: false,
            created_at: datetime!(2024-03-04 10:00 UTC),
            updated_at: datetime!(2024-03-04 10:00 UTC),
            author_name: "Dr. Sarah".into(),
            author_role: Role::Nutritionist,
            entry_eaten_at: datetime!(2024-03-04 08:30 UTC),
            entry_meal_type: Some(MealType::Breakfast),
            entry_user_id: 1,
            entry_user_name: "Demo User".into(),
            food_name: "Chicken Breast (Cooked)".into(),
        };
        let item = CommentFeedItem::from(row);
        assert_eq!(item.author.id, 7);
        assert_eq!(item.meal_entry.food_name, "Chicken Breast (Cooked)");

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["author"]["role"], "NUTRITIONIST");
        assert_eq!(json["meal_entry"]["meal_type"], "breakfast");
    }
}
