use serde::{Deserialize, Serialize};

/// Closed set of account roles. Stored as the `user_role` Postgres enum and
/// serialized uppercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Nutritionist,
    Admin,
}

/// The authenticated identity a request acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_nutritionist(&self) -> bool {
        self.role == Role::Nutritionist
    }
}

/// Minimal projection of a target user needed for a scoping decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerScope {
    pub user_id: i64,
    pub assigned_nutritionist_id: Option<i64>,
}

/// Read access to a user's records: admin, the user themselves, or the
/// nutritionist currently assigned to them. First match wins.
pub fn can_access_user_data(actor: &Actor, target: &OwnerScope) -> bool {
    if actor.is_admin() {
        return true;
    }
    if actor.id == target.user_id {
        return true;
    }
    actor.is_nutritionist() && target.assigned_nutritionist_id == Some(actor.id)
}

/// A meal entry is visible to whoever may see its owner's data.
pub fn can_access_meal_entry(actor: &Actor, owner: &OwnerScope) -> bool {
    can_access_user_data(actor, owner)
}

/// Commenting requires a NUTRITIONIST or ADMIN role; a nutritionist may only
/// comment on entries of users assigned to them.
pub fn can_author_comment(actor: &Actor, owner: &OwnerScope) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Nutritionist => owner.assigned_nutritionist_id == Some(actor.id),
        Role::User => false,
    }
}

/// Strict-ownership writes: only the record's owner may update or delete it.
/// No admin or nutritionist override. Applies to meal entries and profiles.
pub fn can_mutate_record(actor: &Actor, owner_id: i64) -> bool {
    actor.id == owner_id
}

/// Self-or-admin rule shared by comment moderation and author feeds.
pub fn is_self_or_admin(actor: &Actor, user_id: i64) -> bool {
    actor.id == user_id || actor.is_admin()
}

/// Comments additionally allow admin moderation.
pub fn can_moderate_comment(actor: &Actor, author_id: i64) -> bool {
    is_self_or_admin(actor, author_id)
}

/// Listing users is restricted to nutritionists (scoped by the caller to
/// their assigned users) and admins.
pub fn can_list_users(actor: &Actor) -> bool {
    matches!(actor.role, Role::Nutritionist | Role::Admin)
}

/// Creating and editing catalog foods is restricted to nutritionists and
/// admins; deleting them is admin-only and checked via `Actor::is_admin`.
pub fn can_manage_foods(actor: &Actor) -> bool {
    matches!(actor.role, Role::Nutritionist | Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> Actor {
        Actor { id, role: Role::User }
    }

    fn nutritionist(id: i64) -> Actor {
        Actor { id, role: Role::Nutritionist }
    }

    fn admin(id: i64) -> Actor {
        Actor { id, role: Role::Admin }
    }

    fn owned_by(user_id: i64, nutritionist_id: Option<i64>) -> OwnerScope {
        OwnerScope { user_id, assigned_nutritionist_id: nutritionist_id }
    }

    #[test]
    fn admin_passes_every_read_check() {
        let actor = admin(99);
        let scope = owned_by(1, None);
        assert!(can_access_user_data(&actor, &scope));
        assert!(can_access_meal_entry(&actor, &scope));
        assert!(can_author_comment(&actor, &scope));
        assert!(can_list_users(&actor));
        assert!(can_manage_foods(&actor));
    }

    #[test]
    fn user_reads_own_data_but_not_a_peers() {
        let me = user(1);
        // Both users share nutritionist 7; that must not leak peer access.
        assert!(can_access_meal_entry(&me, &owned_by(1, Some(7))));
        assert!(!can_access_meal_entry(&me, &owned_by(2, Some(7))));
        assert!(!can_access_user_data(&me, &owned_by(2, Some(7))));
    }

    #[test]
    fn nutritionist_access_follows_assignment() {
        let n = nutritionist(7);
        assert!(can_access_user_data(&n, &owned_by(1, Some(7))));
        assert!(can_access_meal_entry(&n, &owned_by(1, Some(7))));
        // Unassigned or reassigned users are off limits.
        assert!(!can_access_user_data(&n, &owned_by(1, None)));
        assert!(!can_access_user_data(&n, &owned_by(1, Some(8))));
    }

    #[test]
    fn reassignment_revokes_former_nutritionist() {
        let former = nutritionist(7);
        let scope_before = owned_by(1, Some(7));
        let scope_after = owned_by(1, Some(9));
        assert!(can_access_meal_entry(&former, &scope_before));
        assert!(!can_access_meal_entry(&former, &scope_after));
    }

    #[test]
    fn comment_authoring_requires_role_and_assignment() {
        let scope = owned_by(1, Some(7));
        assert!(can_author_comment(&nutritionist(7), &scope));
        assert!(!can_author_comment(&nutritionist(8), &scope));
        assert!(can_author_comment(&admin(99), &scope));
        // The owner is a plain user and cannot author comments, even on
        // their own entry.
        assert!(!can_author_comment(&user(1), &scope));
    }

    #[test]
    fn record_mutation_is_strict_ownership() {
        assert!(can_mutate_record(&user(1), 1));
        assert!(!can_mutate_record(&user(2), 1));
        // Read access does not imply write access.
        assert!(!can_mutate_record(&nutritionist(7), 1));
        assert!(!can_mutate_record(&admin(99), 1));
    }

    #[test]
    fn comment_moderation_allows_author_and_admin() {
        assert!(can_moderate_comment(&nutritionist(7), 7));
        assert!(!can_moderate_comment(&nutritionist(8), 7));
        assert!(can_moderate_comment(&admin(99), 7));
    }

    #[test]
    fn plain_users_cannot_list_users_or_manage_foods() {
        assert!(!can_list_users(&user(1)));
        assert!(!can_manage_foods(&user(1)));
        assert!(can_list_users(&nutritionist(7)));
        assert!(can_manage_foods(&nutritionist(7)));
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Nutritionist).unwrap(), "\"NUTRITIONIST\"");
        let parsed: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
