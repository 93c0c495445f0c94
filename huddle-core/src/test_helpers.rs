//! Test helpers and fixtures for huddle-core tests
//!
//! Common fixtures and builders to reduce boilerplate across the
//! crate's unit tests.

use chrono::Utc;

use crate::models::{Community, CommunityId, Membership, Role, UserId, Visibility};

/// Create a test user ID
pub fn test_user_id(id: &str) -> UserId {
    UserId::from_string(id.to_string())
}

/// Create a test community ID
pub fn test_community_id(id: &str) -> CommunityId {
    CommunityId::from_string(id.to_string())
}

/// Generate a random user ID for testing
pub fn random_user_id() -> UserId {
    UserId::new()
}

/// Generate a random community ID for testing
pub fn random_community_id() -> CommunityId {
    CommunityId::new()
}

/// Test fixture builder for Community
pub struct CommunityFixture {
    id: CommunityId,
    name: String,
    description: String,
    visibility: Visibility,
    created_by: UserId,
}

impl CommunityFixture {
    pub fn new() -> Self {
        Self {
            id: random_community_id(),
            name: "Test Community".to_string(),
            description: "a community used in tests".to_string(),
            visibility: Visibility::Public,
            created_by: random_user_id(),
        }
    }

    pub fn with_id(mut self, id: CommunityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_creator(mut self, created_by: UserId) -> Self {
        self.created_by = created_by;
        self
    }

    pub fn build(self) -> Community {
        let now = Utc::now();
        Community {
            id: self.id,
            name: self.name,
            description: self.description,
            visibility: self.visibility,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for CommunityFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Test fixture builder for Membership
pub struct MembershipFixture {
    community_id: CommunityId,
    user_id: UserId,
    role: Role,
}

impl MembershipFixture {
    pub fn new() -> Self {
        Self {
            community_id: random_community_id(),
            user_id: random_user_id(),
            role: Role::VIEWER,
        }
    }

    pub fn with_community(mut self, community_id: CommunityId) -> Self {
        self.community_id = community_id;
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn build(self) -> Membership {
        Membership {
            community_id: self.community_id,
            user_id: self.user_id,
            role: self.role,
            joined_at: Utc::now(),
        }
    }
}

impl Default for MembershipFixture {
    fn default() -> Self {
        Self::new()
    }
}
