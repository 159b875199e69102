use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

use crate::access::{Actor, OwnerScope, Role};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "crate::dates::iso::option", default)]
    pub date_of_birth: Option<Date>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub goals: Option<String>,
    pub assigned_nutritionist_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, date_of_birth, height, weight, \
                            gender, activity_level, goals, assigned_nutritionist_id, created_at";

#[derive(Debug, FromRow)]
struct ActorRow {
    id: i64,
    role: Role,
}

#[derive(Debug, FromRow)]
struct ScopeRow {
    id: i64,
    assigned_nutritionist_id: Option<i64>,
}

/// Flat listing row; the optional nutritionist columns come from a
/// self-join and are nested by the DTO layer.
#[derive(Debug, FromRow)]
pub struct UserListRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub assigned_nutritionist_id: Option<i64>,
    pub created_at: OffsetDateTime,
    pub nutritionist_name: Option<String>,
    pub nutritionist_email: Option<String>,
}

/// Optional profile fields accepted by `update_profile`. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub goals: Option<String>,
}

impl User {
    /// Resolve the live actor identity for a verified token subject.
    pub async fn actor_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Actor>> {
        let row = sqlx::query_as::<_, ActorRow>("SELECT id, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row.map(|r| Actor { id: r.id, role: r.role }))
    }

    /// The minimal projection the scoping engine needs about a target user.
    pub async fn owner_scope(db: &PgPool, id: i64) -> anyhow::Result<Option<OwnerScope>> {
        let row = sqlx::query_as::<_, ScopeRow>(
            "SELECT id, assigned_nutritionist_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|r| OwnerScope {
            user_id: r.id,
            assigned_nutritionist_id: r.assigned_nutritionist_id,
        }))
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Registration always creates a plain USER account.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// List users with optional role/search filters. When
    /// `scope_to_nutritionist` is set, only that nutritionist's assigned
    /// users (and the nutritionist themselves) are returned.
    pub async fn list(
        db: &PgPool,
        scope_to_nutritionist: Option<i64>,
        role: Option<Role>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<UserListRow>> {
        let rows = sqlx::query_as::<_, UserListRow>(
            r#"
            SELECT u.id, u.name, u.email, u.role, u.assigned_nutritionist_id, u.created_at,
                   n.name AS nutritionist_name, n.email AS nutritionist_email
            FROM users u
            LEFT JOIN users n ON n.id = u.assigned_nutritionist_id
            WHERE ($1::bigint IS NULL OR u.assigned_nutritionist_id = $1 OR u.id = $1)
              AND ($2::user_role IS NULL OR u.role = $2)
              AND ($3::text IS NULL OR u.name ILIKE '%' || $3 || '%' OR u.email ILIKE '%' || $3 || '%')
            ORDER BY u.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(scope_to_nutritionist)
        .bind(role)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(
        db: &PgPool,
        scope_to_nutritionist: Option<i64>,
        role: Option<Role>,
        search: Option<&str>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users u
            WHERE ($1::bigint IS NULL OR u.assigned_nutritionist_id = $1 OR u.id = $1)
              AND ($2::user_role IS NULL OR u.role = $2)
              AND ($3::text IS NULL OR u.name ILIKE '%' || $3 || '%' OR u.email ILIKE '%' || $3 || '%')
            "#,
        )
        .bind(scope_to_nutritionist)
        .bind(role)
        .bind(search)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    /// Apply a partial profile update. Role and email are deliberately not
    /// updatable through this path.
    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        patch: &ProfilePatch,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 date_of_birth = COALESCE($3, date_of_birth), \
                 height = COALESCE($4, height), \
                 weight = COALESCE($5, weight), \
                 gender = COALESCE($6, gender), \
                 activity_level = COALESCE($7, activity_level), \
                 goals = COALESCE($8, goals) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.date_of_birth)
        .bind(patch.height)
        .bind(patch.weight)
        .bind(patch.gender.as_deref())
        .bind(patch.activity_level.as_deref())
        .bind(patch.goals.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Set or clear (with `None`) a user's assigned nutritionist.
    pub async fn assign_nutritionist(
        db: &PgPool,
        id: i64,
        nutritionist_id: Option<i64>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET assigned_nutritionist_id = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(nutritionist_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Look up a user only if they hold the NUTRITIONIST role.
    pub async fn find_nutritionist(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND role = 'NUTRITIONIST'"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
