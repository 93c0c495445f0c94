//! Invite issuer.
//!
//! Generates time-boxed join tokens for private communities and the
//! shareable links that embed them. Consumption happens on the join path in
//! `CommunityService`; tokens are read there, not deleted, and stay valid
//! until expiry.

use chrono::{Duration, Utc};
use nanoid::nanoid;
use sqlx::PgPool;
use tracing::{debug, info};
use url::Url;

use crate::{
    config::InviteConfig,
    models::{CommunityId, Invite, IssuedInvite, PermissionSet},
    repository::{CommunityRepository, InviteRepository, MembershipRepository},
    service::{authorization::authorize, AuthenticatedActor},
    transaction::UnitOfWork,
    Error, Result,
};

/// Number of nanoid symbols per token. 32 symbols over the default
/// 64-symbol alphabet carry 192 bits of entropy; unguessability is the only
/// uniqueness mechanism relied on.
const TOKEN_LENGTH: usize = 32;

/// Invite service
#[derive(Clone)]
pub struct InviteService {
    pool: PgPool,
    invite_repo: InviteRepository,
    membership_repo: MembershipRepository,
    community_repo: CommunityRepository,
    config: InviteConfig,
}

impl std::fmt::Debug for InviteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteService").finish()
    }
}

impl InviteService {
    pub fn new(pool: PgPool, config: InviteConfig) -> Self {
        Self {
            invite_repo: InviteRepository::new(pool.clone()),
            membership_repo: MembershipRepository::new(pool.clone()),
            community_repo: CommunityRepository::new(pool.clone()),
            pool,
            config,
        }
    }

    /// Issue an invite for a community.
    ///
    /// Requires ISSUE_INVITE (Admin or Owner). Returns the persisted invite
    /// together with its shareable link.
    pub async fn issue(
        &self,
        actor: AuthenticatedActor,
        community_id: CommunityId,
    ) -> Result<IssuedInvite> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        self.community_repo
            .get_for_update_in_tx(uow.conn(), &community_id)
            .await?
            .ok_or_else(|| Error::NotFound("Community not found".to_string()))?;

        let actor_role = self
            .membership_repo
            .get_in_tx(uow.conn(), &community_id, &actor.user_id)
            .await?
            .map(|m| m.role);
        authorize(actor_role, PermissionSet(PermissionSet::ISSUE_INVITE))?;

        let expires_at = Utc::now() + Duration::days(self.config.expiry_days);

        // Token entropy makes a collision negligible; if one happens anyway,
        // regenerate once and treat a second collision as a hard failure.
        let mut invite = Invite::new(
            community_id.clone(),
            nanoid!(TOKEN_LENGTH),
            actor.user_id.clone(),
            expires_at,
        );
        let created = match self.invite_repo.insert_in_tx(uow.conn(), &invite).await {
            Err(Error::Conflict(_)) => {
                invite.token = nanoid!(TOKEN_LENGTH);
                self.invite_repo
                    .insert_in_tx(uow.conn(), &invite)
                    .await
                    .map_err(|err| match err {
                        Error::Conflict(_) => {
                            Error::Internal("invite token collided twice".to_string())
                        }
                        other => other,
                    })?
            }
            other => other?,
        };
        uow.commit().await?;

        let url = build_share_url(&self.config.base_url, &created.token)?;

        info!(
            community_id = %community_id,
            issued_by = %actor.user_id,
            "invite issued"
        );

        Ok(IssuedInvite {
            invite: created,
            url,
        })
    }

    /// List a community's invites. Requires ISSUE_INVITE.
    pub async fn list(
        &self,
        actor: &AuthenticatedActor,
        community_id: &CommunityId,
    ) -> Result<Vec<Invite>> {
        let actor_role = self
            .membership_repo
            .role_of(community_id, &actor.user_id)
            .await?;
        authorize(actor_role, PermissionSet(PermissionSet::ISSUE_INVITE))?;

        self.invite_repo.list_by_community(community_id).await
    }

    /// Purge expired invites; returns the number removed.
    pub async fn delete_expired(&self) -> Result<u64> {
        let removed = self.invite_repo.delete_expired().await?;
        if removed > 0 {
            debug!(removed, "expired invites purged");
        }
        Ok(removed)
    }
}

/// Build the shareable link embedding a token.
fn build_share_url(base_url: &str, token: &str) -> Result<String> {
    let base = Url::parse(base_url)
        .map_err(|e| Error::Internal(format!("invalid invite base_url: {e}")))?;
    let url = base
        .join(&format!("invites/{token}"))
        .map_err(|e| Error::Internal(format!("invalid invite link: {e}")))?;
    Ok(url.to_string())
}
