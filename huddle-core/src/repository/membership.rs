use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{CommunityId, Membership, MembershipWithUser, Role, UserId},
    Result,
};

/// Membership repository for database operations.
///
/// The memberships table carries a unique constraint on
/// (community_id, user_id); a duplicate insert surfaces as
/// `Error::Conflict` through the sqlx error mapping.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a membership inside the caller's transaction
    pub async fn insert_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        membership: &Membership,
    ) -> Result<Membership> {
        let row = sqlx::query(
            "INSERT INTO memberships (community_id, user_id, role, joined_at)
             VALUES ($1, $2, $3, $4)
             RETURNING community_id, user_id, role, joined_at",
        )
        .bind(membership.community_id.as_str())
        .bind(membership.user_id.as_str())
        .bind(membership.role)
        .bind(membership.joined_at)
        .fetch_one(conn)
        .await?;

        row_to_membership(&row)
    }

    /// Get membership by community and user
    pub async fn get(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query(
            "SELECT community_id, user_id, role, joined_at
             FROM memberships
             WHERE community_id = $1 AND user_id = $2",
        )
        .bind(community_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_membership(&row)?)),
            None => Ok(None),
        }
    }

    /// Get membership inside the caller's transaction
    pub async fn get_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query(
            "SELECT community_id, user_id, role, joined_at
             FROM memberships
             WHERE community_id = $1 AND user_id = $2",
        )
        .bind(community_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(conn)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_membership(&row)?)),
            None => Ok(None),
        }
    }

    /// Overwrite a membership's role inside the caller's transaction
    pub async fn update_role_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
        user_id: &UserId,
        role: Role,
    ) -> Result<Membership> {
        let row = sqlx::query(
            "UPDATE memberships
             SET role = $3
             WHERE community_id = $1 AND user_id = $2
             RETURNING community_id, user_id, role, joined_at",
        )
        .bind(community_id.as_str())
        .bind(user_id.as_str())
        .bind(role)
        .fetch_one(conn)
        .await?;

        row_to_membership(&row)
    }

    /// Delete one membership inside the caller's transaction
    pub async fn delete_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM memberships WHERE community_id = $1 AND user_id = $2",
        )
        .bind(community_id.as_str())
        .bind(user_id.as_str())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every membership of a community (cascade path)
    pub async fn delete_all_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM memberships WHERE community_id = $1")
            .bind(community_id.as_str())
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Count members inside the caller's transaction
    pub async fn count_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships WHERE community_id = $1",
        )
        .bind(community_id.as_str())
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Count members holding a given role inside the caller's transaction
    pub async fn count_with_role_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
        role: Role,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships WHERE community_id = $1 AND role = $2",
        )
        .bind(community_id.as_str())
        .bind(role)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// List all members of a community with user info
    pub async fn list_by_community(
        &self,
        community_id: &CommunityId,
    ) -> Result<Vec<MembershipWithUser>> {
        let rows = sqlx::query(
            "SELECT m.community_id, m.user_id, m.role, m.joined_at, u.username
             FROM memberships m
             JOIN users u ON m.user_id = u.id
             WHERE m.community_id = $1
             ORDER BY m.joined_at ASC",
        )
        .bind(community_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_membership_with_user).collect()
    }

    /// Get member count for a community
    pub async fn count_by_community(&self, community_id: &CommunityId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships WHERE community_id = $1",
        )
        .bind(community_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Get a user's role in a community, if any.
    ///
    /// The read-only gate used by the project/task subsystems.
    pub async fn role_of(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<Role>> {
        let role: Option<Role> = sqlx::query_scalar(
            "SELECT role FROM memberships WHERE community_id = $1 AND user_id = $2",
        )
        .bind(community_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Communities a user belongs to, paginated, newest membership first
    pub async fn list_by_user(
        &self,
        user_id: &UserId,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<CommunityId>, i64)> {
        let offset = (page - 1) * page_size;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        let ids = sqlx::query_scalar::<_, String>(
            "SELECT community_id
             FROM memberships
             WHERE user_id = $1
             ORDER BY joined_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id.as_str())
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let community_ids = ids.into_iter().map(CommunityId::from_string).collect();

        Ok((community_ids, count))
    }
}

/// Convert database row to Membership
fn row_to_membership(row: &PgRow) -> Result<Membership> {
    Ok(Membership {
        community_id: CommunityId::from_string(row.try_get("community_id")?),
        user_id: UserId::from_string(row.try_get("user_id")?),
        role: row.try_get("role")?,
        joined_at: row.try_get("joined_at")?,
    })
}

/// Convert database row to MembershipWithUser
fn row_to_membership_with_user(row: &PgRow) -> Result<MembershipWithUser> {
    Ok(MembershipWithUser {
        community_id: CommunityId::from_string(row.try_get("community_id")?),
        user_id: UserId::from_string(row.try_get("user_id")?),
        username: row.try_get("username")?,
        role: row.try_get("role")?,
        joined_at: row.try_get("joined_at")?,
    })
}

#[cfg(test)]
mod tests {

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_unique_membership_constraint() {
        // Integration test placeholder
    }
}
