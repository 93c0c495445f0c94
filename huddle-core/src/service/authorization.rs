//! Authorization guard.
//!
//! Pure allow/deny decision over the role permission table. Every mutating
//! path calls this before any write; read-only membership-scoped queries
//! bypass it and filter on membership existence instead.

use crate::{
    models::{PermissionSet, Role},
    Error, Result,
};

/// Allow or deny an action for an actor's role in the target community.
///
/// `actor_role` is `None` when the actor holds no membership there.
pub fn authorize(actor_role: Option<Role>, required: PermissionSet) -> Result<()> {
    let Some(role) = actor_role else {
        return Err(Error::Forbidden(
            "not a member of this community".to_string(),
        ));
    };

    if !role.permissions().contains(required) {
        return Err(Error::Forbidden("permission denied".to_string()));
    }

    Ok(())
}
