//! Role hierarchy and permission matrix.
//!
//! Roles are values carried on a membership, never stored as entities of
//! their own. Each role maps to a fixed permission set; the mapping here is
//! the single source of truth consulted by the authorization guard — no
//! other module may hardcode role comparisons.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 64-bit permission bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(pub u64);

impl PermissionSet {
    // ===== Task permissions (0-9) =====

    /// Read-only access to the community and its contents
    pub const VIEW: u64 = 1 << 0;

    /// Create a task
    pub const CREATE_TASK: u64 = 1 << 1;

    /// Edit a task
    pub const EDIT_TASK: u64 = 1 << 2;

    /// Delete a task
    pub const DELETE_TASK: u64 = 1 << 3;

    /// Assign a task to a member
    pub const ASSIGN_TASK: u64 = 1 << 4;

    // ===== Project permissions (10-19) =====

    /// Create a project
    pub const CREATE_PROJECT: u64 = 1 << 10;

    /// Edit a project
    pub const EDIT_PROJECT: u64 = 1 << 11;

    /// Delete a project
    pub const DELETE_PROJECT: u64 = 1 << 12;

    // ===== Member management permissions (20-29) =====

    /// Add a member directly
    pub const ADD_MEMBER: u64 = 1 << 20;

    /// Remove a member
    pub const REMOVE_MEMBER: u64 = 1 << 21;

    /// Change another member's role
    pub const CHANGE_MEMBER_ROLE: u64 = 1 << 22;

    /// Issue invite links
    pub const ISSUE_INVITE: u64 = 1 << 23;

    // ===== Community management permissions (30-39) =====

    /// Modify community settings
    pub const MANAGE_SETTINGS: u64 = 1 << 30;

    /// Edit community name/description/visibility
    pub const EDIT_COMMUNITY: u64 = 1 << 31;

    /// Delete the community
    pub const DELETE_COMMUNITY: u64 = 1 << 32;

    // ===== Permission combinations =====

    /// All permissions (for Owner)
    pub const ALL: u64 = u64::MAX;

    /// Lowest tier: view plus task create/edit
    pub const DEFAULT_DEVELOPER_I: u64 = Self::VIEW | Self::CREATE_TASK | Self::EDIT_TASK;

    /// Developer II adds task deletion and assignment
    pub const DEFAULT_DEVELOPER_II: u64 =
        Self::DEFAULT_DEVELOPER_I | Self::DELETE_TASK | Self::ASSIGN_TASK;

    /// Developer III adds project creation and editing
    pub const DEFAULT_DEVELOPER_III: u64 =
        Self::DEFAULT_DEVELOPER_II | Self::CREATE_PROJECT | Self::EDIT_PROJECT;

    /// Manager adds project deletion and direct member addition
    pub const DEFAULT_MANAGER: u64 =
        Self::DEFAULT_DEVELOPER_III | Self::DELETE_PROJECT | Self::ADD_MEMBER;

    /// Admin adds member/role management and community administration
    pub const DEFAULT_ADMIN: u64 = Self::DEFAULT_MANAGER
        | Self::REMOVE_MEMBER
        | Self::CHANGE_MEMBER_ROLE
        | Self::ISSUE_INVITE
        | Self::MANAGE_SETTINGS
        | Self::EDIT_COMMUNITY
        | Self::DELETE_COMMUNITY;

    pub const NONE: u64 = 0;

    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(Self::NONE)
    }

    /// Check if has specific permission
    #[must_use]
    pub const fn has(&self, permission: u64) -> bool {
        (self.0 & permission) != 0
    }

    /// Check if has all specified permissions
    #[must_use]
    pub const fn has_all(&self, permissions: u64) -> bool {
        (self.0 & permissions) == permissions
    }

    /// Check if has any of the specified permissions
    #[must_use]
    pub const fn has_any(&self, permissions: u64) -> bool {
        (self.0 & permissions) != 0
    }

    /// Check if this set contains the whole of `required`
    #[must_use]
    pub const fn contains(&self, required: Self) -> bool {
        (self.0 & required.0) == required.0
    }

    /// Add permission
    pub const fn grant(&mut self, permission: u64) {
        self.0 |= permission;
    }

    /// Remove permission
    pub const fn revoke(&mut self, permission: u64) {
        self.0 &= !permission;
    }

    /// Union of two sets
    #[must_use]
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Community role (fixed hierarchy)
///
/// Ordered from highest to lowest: Owner > Admin > Manager > DeveloperIii >
/// DeveloperIi > DeveloperI. Each role's permission set is a superset of
/// every role below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Community owner - has all permissions (fixed, cannot be modified)
    Owner,
    /// Administrator - member/role management plus everything below
    Admin,
    /// Manager - project deletion, member addition, plus everything below
    Manager,
    /// Senior developer - project create/edit plus everything below
    DeveloperIii,
    /// Developer - task delete/assign plus everything below
    DeveloperIi,
    /// Junior developer / viewer tier - view plus task create/edit
    DeveloperI,
}

impl Role {
    /// The lowest tier; new members join with this role.
    pub const VIEWER: Self = Self::DeveloperI;

    /// Get the permission set for this role.
    ///
    /// Total over the enum; there is no failure mode.
    #[must_use]
    pub const fn permissions(&self) -> PermissionSet {
        match self {
            Self::Owner => PermissionSet(PermissionSet::ALL),
            Self::Admin => PermissionSet(PermissionSet::DEFAULT_ADMIN),
            Self::Manager => PermissionSet(PermissionSet::DEFAULT_MANAGER),
            Self::DeveloperIii => PermissionSet(PermissionSet::DEFAULT_DEVELOPER_III),
            Self::DeveloperIi => PermissionSet(PermissionSet::DEFAULT_DEVELOPER_II),
            Self::DeveloperI => PermissionSet(PermissionSet::DEFAULT_DEVELOPER_I),
        }
    }

    #[must_use]
    pub const fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::DeveloperIii => "developer_iii",
            Self::DeveloperIi => "developer_ii",
            Self::DeveloperI => "developer_i",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "developer_iii" => Ok(Self::DeveloperIii),
            "developer_ii" => Ok(Self::DeveloperIi),
            "developer_i" | "viewer" => Ok(Self::DeveloperI),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Database mapping: Role -> SMALLINT (1=owner .. 6=developer_i)
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let val: i16 = match self {
            Self::Owner => 1,
            Self::Admin => 2,
            Self::Manager => 3,
            Self::DeveloperIii => 4,
            Self::DeveloperIi => 5,
            Self::DeveloperI => 6,
        };
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&val, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let val = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match val {
            1 => Ok(Self::Owner),
            2 => Ok(Self::Admin),
            3 => Ok(Self::Manager),
            4 => Ok(Self::DeveloperIii),
            5 => Ok(Self::DeveloperIi),
            6 => Ok(Self::DeveloperI),
            _ => Err(format!("Invalid Role value: {val}").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_has() {
        let perms = PermissionSet(PermissionSet::VIEW);
        assert!(perms.has(PermissionSet::VIEW));
        assert!(!perms.has(PermissionSet::CREATE_PROJECT));
    }

    #[test]
    fn test_permission_grant_revoke() {
        let mut perms = PermissionSet::empty();
        perms.grant(PermissionSet::CREATE_TASK);
        perms.grant(PermissionSet::EDIT_TASK);

        assert!(perms.has(PermissionSet::CREATE_TASK));
        assert!(perms.has(PermissionSet::EDIT_TASK));

        perms.revoke(PermissionSet::CREATE_TASK);
        assert!(!perms.has(PermissionSet::CREATE_TASK));
        assert!(perms.has(PermissionSet::EDIT_TASK));
    }

    #[test]
    fn test_role_hierarchy_is_nested() {
        // Each tier must contain the whole of the tier below it
        let tiers = [
            Role::DeveloperI,
            Role::DeveloperIi,
            Role::DeveloperIii,
            Role::Manager,
            Role::Admin,
            Role::Owner,
        ];
        for pair in tiers.windows(2) {
            assert!(
                pair[1].permissions().contains(pair[0].permissions()),
                "{} must be a superset of {}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn test_every_role_maps_to_nonempty_set() {
        for role in [
            Role::Owner,
            Role::Admin,
            Role::Manager,
            Role::DeveloperIii,
            Role::DeveloperIi,
            Role::DeveloperI,
        ] {
            assert_ne!(role.permissions().0, PermissionSet::NONE);
        }
    }

    #[test]
    fn test_viewer_tier_permissions() {
        let perms = Role::VIEWER.permissions();
        assert!(perms.has(PermissionSet::VIEW));
        assert!(perms.has(PermissionSet::CREATE_TASK));
        assert!(perms.has(PermissionSet::EDIT_TASK));
        assert!(!perms.has(PermissionSet::DELETE_TASK));
        assert!(!perms.has(PermissionSet::CREATE_PROJECT));
        assert!(!perms.has(PermissionSet::CHANGE_MEMBER_ROLE));
    }

    #[test]
    fn test_admin_permissions() {
        let perms = Role::Admin.permissions();
        assert!(perms.has_all(PermissionSet::DEFAULT_MANAGER));
        assert!(perms.has(PermissionSet::CHANGE_MEMBER_ROLE));
        assert!(perms.has(PermissionSet::REMOVE_MEMBER));
        assert!(perms.has(PermissionSet::ISSUE_INVITE));
        assert!(perms.has(PermissionSet::DELETE_COMMUNITY));
    }

    #[test]
    fn test_manager_cannot_manage_roles() {
        let perms = Role::Manager.permissions();
        assert!(perms.has(PermissionSet::ADD_MEMBER));
        assert!(perms.has(PermissionSet::DELETE_PROJECT));
        assert!(!perms.has(PermissionSet::CHANGE_MEMBER_ROLE));
        assert!(!perms.has(PermissionSet::DELETE_COMMUNITY));
    }

    #[test]
    fn test_owner_has_everything() {
        let perms = Role::Owner.permissions();
        assert!(perms.has(PermissionSet::DELETE_COMMUNITY));
        assert!(perms.has(PermissionSet::VIEW));
        assert!(perms.has_all(PermissionSet::DEFAULT_ADMIN));
    }

    #[test]
    fn test_role_serde_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::to_string(&Role::DeveloperIii).unwrap(),
            "\"developer_iii\""
        );
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in [
            Role::Owner,
            Role::Admin,
            Role::Manager,
            Role::DeveloperIii,
            Role::DeveloperIi,
            Role::DeveloperI,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        // "viewer" is an accepted spelling of the lowest tier
        assert_eq!("viewer".parse::<Role>().unwrap(), Role::DeveloperI);
    }
}
