use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{CommunityId, UserId};
use crate::Error;

/// Community visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(Error::Internal(format!("Unknown visibility: {s}"))),
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level tenant entity containing projects and tasks.
///
/// A community row exists iff at least one membership references it, except
/// inside the creation transaction. All mutation goes through
/// `CommunityService`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Community {
    pub fn new(
        name: String,
        description: String,
        visibility: Visibility,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CommunityId::new(),
            name,
            description,
            visibility,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_private(&self) -> bool {
        self.visibility.is_private()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCommunityRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityListQuery {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
}

impl Default for CommunityListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            search: None,
        }
    }
}

/// Community with member count (for listing with JOIN)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityWithCount {
    #[serde(flatten)]
    pub community: Community,
    pub member_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_community_is_public_by_default_query() {
        let c = Community::new(
            "rustaceans".to_string(),
            "a place for crustaceans".to_string(),
            Visibility::default(),
            UserId::new(),
        );
        assert!(!c.is_private());
        assert_eq!(c.created_at, c.updated_at);
    }

    #[test]
    fn test_visibility_roundtrip() {
        assert_eq!("private".parse::<Visibility>().unwrap(), Visibility::Private);
        assert_eq!(Visibility::Public.to_string(), "public");
        assert!("hidden".parse::<Visibility>().is_err());
    }
}
