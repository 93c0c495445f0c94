pub mod authorization;
pub mod community;
pub mod invite;

pub use authorization::authorize;
pub use community::{
    check_role_change, leave_action, CommunityService, LeaveAction, LeaveOutcome,
};
pub use invite::InviteService;

use crate::models::UserId;

/// Authenticated caller identity, resolved by the transport layer.
///
/// The only actor representation the core accepts; request objects never
/// reach this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor {
    pub user_id: UserId,
}

impl AuthenticatedActor {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}
