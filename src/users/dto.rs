use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::access::Role;
use crate::nutrition::{DayNutrition, NutrientTotals};
use crate::users::repo::{User, UserListRow};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub role: Option<Role>,
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    20
}

/// Compact reference to an assigned nutritionist.
#[derive(Debug, Serialize)]
pub struct NutritionistRef {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub assigned_nutritionist_id: Option<i64>,
    pub assigned_nutritionist: Option<NutritionistRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserListRow> for UserSummary {
    fn from(row: UserListRow) -> Self {
        let assigned_nutritionist = match (row.assigned_nutritionist_id, row.nutritionist_name) {
            (Some(id), Some(name)) => Some(NutritionistRef {
                id,
                name,
                email: row.nutritionist_email.unwrap_or_default(),
            }),
            _ => None,
        };
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            assigned_nutritionist_id: row.assigned_nutritionist_id,
            assigned_nutritionist,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub assigned_nutritionist: Option<NutritionistRef>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(with = "crate::dates::iso::option", default)]
    pub date_of_birth: Option<Date>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub goals: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignNutritionistRequest {
    pub nutritionist_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NutritionSummaryResponse {
    pub summary: NutrientTotals,
    pub daily_breakdown: Vec<DayNutrition>,
    pub total_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn summary_nests_the_assigned_nutritionist() {
        let row = UserListRow {
            id: 1,
            name: "Demo User".into(),
            email: "user1@example.com".into(),
            role: Role::User,
            assigned_nutritionist_id: Some(7),
            created_at: datetime!(2024-01-01 00:00 UTC),
            nutritionist_name: Some("Dr. Sarah".into()),
            nutritionist_email: Some("sarah@example.com".into()),
        };
        let summary = UserSummary::from(row);
        let nested = summary.assigned_nutritionist.expect("nutritionist present");
        assert_eq!(nested.id, 7);
        assert_eq!(nested.name, "Dr. Sarah");
    }

    #[test]
    fn summary_without_assignment_has_no_nested_ref() {
        let row = UserListRow {
            id: 2,
            name: "Solo".into(),
            email: "solo@example.com".into(),
            role: Role::User,
            assigned_nutritionist_id: None,
            created_at: datetime!(2024-01-01 00:00 UTC),
            nutritionist_name: None,
            nutritionist_email: None,
        };
        assert!(UserSummary::from(row).assigned_nutritionist.is_none());
    }
}
