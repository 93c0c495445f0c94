use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Community, CommunityId, CommunityListQuery, CommunityWithCount, UserId, Visibility},
    Error, Result,
};

/// Community repository for database operations
#[derive(Clone)]
pub struct CommunityRepository {
    pool: PgPool,
}

impl CommunityRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new community inside the caller's transaction
    pub async fn insert_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community: &Community,
    ) -> Result<Community> {
        let row = sqlx::query(
            "INSERT INTO communities (id, name, description, visibility, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, name, description, visibility, created_by, created_at, updated_at",
        )
        .bind(community.id.as_str())
        .bind(&community.name)
        .bind(&community.description)
        .bind(community.visibility.as_str())
        .bind(community.created_by.as_str())
        .bind(community.created_at)
        .bind(community.updated_at)
        .fetch_one(conn)
        .await?;

        row_to_community(&row)
    }

    /// Get community by ID
    pub async fn get_by_id(&self, community_id: &CommunityId) -> Result<Option<Community>> {
        let row = sqlx::query(
            "SELECT id, name, description, visibility, created_by, created_at, updated_at
             FROM communities
             WHERE id = $1",
        )
        .bind(community_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_community(&row)?)),
            None => Ok(None),
        }
    }

    /// Get community by ID inside the caller's transaction, locking the row.
    ///
    /// `FOR UPDATE` serializes concurrent lifecycle writers on the same
    /// community, so aggregate checks (admin count, member count) read a
    /// stable view until commit.
    pub async fn get_for_update_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
    ) -> Result<Option<Community>> {
        let row = sqlx::query(
            "SELECT id, name, description, visibility, created_by, created_at, updated_at
             FROM communities
             WHERE id = $1
             FOR UPDATE",
        )
        .bind(community_id.as_str())
        .fetch_optional(conn)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_community(&row)?)),
            None => Ok(None),
        }
    }

    /// Update community fields inside the caller's transaction
    pub async fn update_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community: &Community,
    ) -> Result<Community> {
        let row = sqlx::query(
            "UPDATE communities
             SET name = $2, description = $3, visibility = $4, updated_at = $5
             WHERE id = $1
             RETURNING id, name, description, visibility, created_by, created_at, updated_at",
        )
        .bind(community.id.as_str())
        .bind(&community.name)
        .bind(&community.description)
        .bind(community.visibility.as_str())
        .bind(chrono::Utc::now())
        .fetch_one(conn)
        .await?;

        row_to_community(&row)
    }

    /// Delete the community row inside the caller's transaction.
    ///
    /// Dependent memberships and invites are deleted explicitly by the
    /// lifecycle manager before this call; no implicit FK cascade is relied on.
    pub async fn delete_in_tx(
        &self,
        conn: &mut sqlx::PgConnection,
        community_id: &CommunityId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM communities WHERE id = $1")
            .bind(community_id.as_str())
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List public communities with member counts, paginated
    pub async fn list_public(
        &self,
        query: &CommunityListQuery,
    ) -> Result<(Vec<CommunityWithCount>, i64)> {
        let offset = (query.page - 1) * query.page_size;

        let count: i64 = if let Some(ref search) = query.search {
            let pattern = format!("%{search}%");
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM communities
                 WHERE visibility = 'public' AND (name ILIKE $1 OR description ILIKE $1)",
            )
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM communities WHERE visibility = 'public'")
                .fetch_one(&self.pool)
                .await?
        };

        let list_query = if query.search.is_some() {
            "SELECT
                c.id, c.name, c.description, c.visibility, c.created_by,
                c.created_at, c.updated_at,
                COUNT(m.user_id) as member_count
             FROM communities c
             LEFT JOIN memberships m ON c.id = m.community_id
             WHERE c.visibility = 'public' AND (c.name ILIKE $3 OR c.description ILIKE $3)
             GROUP BY c.id, c.name, c.description, c.visibility, c.created_by, c.created_at, c.updated_at
             ORDER BY c.created_at DESC
             LIMIT $1 OFFSET $2"
        } else {
            "SELECT
                c.id, c.name, c.description, c.visibility, c.created_by,
                c.created_at, c.updated_at,
                COUNT(m.user_id) as member_count
             FROM communities c
             LEFT JOIN memberships m ON c.id = m.community_id
             WHERE c.visibility = 'public'
             GROUP BY c.id, c.name, c.description, c.visibility, c.created_by, c.created_at, c.updated_at
             ORDER BY c.created_at DESC
             LIMIT $1 OFFSET $2"
        };

        let rows = if let Some(ref search) = query.search {
            let pattern = format!("%{search}%");
            sqlx::query(list_query)
                .bind(query.page_size)
                .bind(offset)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(list_query)
                .bind(query.page_size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
        };

        let communities: Result<Vec<CommunityWithCount>> = rows
            .iter()
            .map(|row| {
                let member_count: i64 = row.try_get("member_count")?;
                let community = row_to_community(row)?;
                Ok(CommunityWithCount {
                    community,
                    member_count,
                })
            })
            .collect();

        Ok((communities?, count))
    }
}

/// Convert database row to Community model
fn row_to_community(row: &PgRow) -> Result<Community> {
    let visibility_str: String = row.try_get("visibility")?;
    let visibility = match visibility_str.as_str() {
        "public" => Visibility::Public,
        "private" => Visibility::Private,
        other => return Err(Error::Internal(format!("Unknown visibility: {other}"))),
    };

    Ok(Community {
        id: CommunityId::from_string(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        visibility,
        created_by: UserId::from_string(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_insert_and_get() {
        // Integration test placeholder
    }
}
