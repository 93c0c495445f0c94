use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CommunityId, UserId};
use super::role::Role;

/// The (community, user, role) relationship granting a user standing in a
/// community. Unique per (community_id, user_id) pair; a user never holds
/// two roles in the same community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(community_id: CommunityId, user_id: UserId, role: Role) -> Self {
        Self {
            community_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Membership joined with user info for member listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipWithUser {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_membership_carries_role() {
        let m = Membership::new(CommunityId::new(), UserId::new(), Role::VIEWER);
        assert_eq!(m.role, Role::DeveloperI);
    }
}
