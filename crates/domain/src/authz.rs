use crate::models::{Role, User};

pub fn role_level(role: Role) -> u8 {
    match role {
        Role::User => 1,
        Role::Moderator => 2,
        Role::Admin => 3,
    }
}

/// Whether `actor` may suspend, re-role or delete `target`.
/// Users can always act on themselves; otherwise the actor needs at least the
/// target's role level.
pub fn is_authorized(actor: &User, target: &User) -> bool {
    if actor.id == target.id {
        return true;
    }
    role_level(actor.role) >= role_level(target.role)
}
