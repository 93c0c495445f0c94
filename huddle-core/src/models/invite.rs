use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CommunityId, InviteId, UserId};

/// Opaque, time-limited token permitting Join into a private community.
///
/// Created by an authorized actor, read (not deleted) by the join path,
/// never mutated. Multi-use until expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub community_id: CommunityId,
    pub token: String,
    pub issued_by: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn new(
        community_id: CommunityId,
        token: String,
        issued_by: UserId,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InviteId::new(),
            community_id,
            token,
            issued_by,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// An issued invite together with its shareable link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedInvite {
    pub invite: Invite,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let invite = Invite::new(
            CommunityId::new(),
            "tok".to_string(),
            UserId::new(),
            now + Duration::days(7),
        );
        assert!(!invite.is_expired(now));
        assert!(invite.is_expired(now + Duration::days(7)));
        assert!(invite.is_expired(now + Duration::days(8)));
    }
}
