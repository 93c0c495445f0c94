//! Community membership lifecycle manager.
//!
//! The single invariant-preserving mutation path for communities and
//! memberships. Every operation runs inside one transaction: the community
//! row is locked before any aggregate check, the branch decision is taken
//! against the transaction's view, and either every write commits or none
//! does.
//!
//! The branch decisions themselves (`leave_action`, `check_role_change`)
//! are pure functions over snapshot values, so the state machine is
//! testable without a database.

use sqlx::PgPool;
use tracing::{debug, info};

use crate::{
    models::{
        Community, CommunityId, CommunityListQuery, CommunityWithCount, CreateCommunityRequest,
        Membership, MembershipWithUser, PermissionSet, Role, UpdateCommunityRequest, UserId,
    },
    repository::{CommunityRepository, InviteRepository, MembershipRepository},
    service::{authorization::authorize, AuthenticatedActor},
    transaction::UnitOfWork,
    validation::{CommunityNameValidator, DescriptionValidator},
    Error, Result,
};

/// Outcome of a leave operation.
///
/// Distinguishes plain departure from the cascades that remove the whole
/// community (owner departure, or the last member of any role leaving).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The membership was removed; the community remains.
    Left,
    /// The departure cascaded: community, memberships, and invites are gone.
    CommunityDeleted,
}

/// What a leave request must do, decided from the transaction's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    /// Owner departure: cascade-delete the whole community.
    DeleteCommunity,
    /// Last admin may not leave; refuse with Conflict, no mutation.
    RefuseLastAdmin,
    /// Remove the membership (orphan cleanup checked after the delete).
    RemoveMembership,
}

/// Decide how a leave request is handled.
///
/// `admin_count` is the number of Admin members read inside the same
/// transaction, including the actor when the actor is an Admin.
#[must_use]
pub fn leave_action(role: Role, admin_count: i64) -> LeaveAction {
    match role {
        Role::Owner => LeaveAction::DeleteCommunity,
        Role::Admin if admin_count <= 1 => LeaveAction::RefuseLastAdmin,
        _ => LeaveAction::RemoveMembership,
    }
}

/// Validate a role change against the hierarchy's safety rules.
///
/// Owner standing never moves through the generic role-change operation:
/// demoting the owner and promoting to owner are both refused (ownership
/// transfer would be a distinct operation). Demoting the last admin out of
/// the admin tier is refused so the community cannot be left unmanageable.
///
/// `admin_count` is read inside the same transaction and includes the
/// target when the target is an Admin.
pub fn check_role_change(target_role: Role, new_role: Role, admin_count: i64) -> Result<()> {
    if target_role.is_owner() && !new_role.is_owner() {
        return Err(Error::Forbidden(
            "cannot demote the community owner".to_string(),
        ));
    }

    if new_role.is_owner() && !target_role.is_owner() {
        return Err(Error::Forbidden(
            "ownership cannot be granted through a role change".to_string(),
        ));
    }

    if target_role.is_admin() && !new_role.is_admin() && admin_count <= 1 {
        return Err(Error::Conflict("cannot demote the last admin".to_string()));
    }

    Ok(())
}

/// Community service — creation, join/leave, role changes, deletion.
#[derive(Clone)]
pub struct CommunityService {
    pool: PgPool,
    community_repo: CommunityRepository,
    membership_repo: MembershipRepository,
    invite_repo: InviteRepository,
}

impl std::fmt::Debug for CommunityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunityService").finish()
    }
}

impl CommunityService {
    /// Create a new community service over the injected storage handle.
    pub fn new(pool: PgPool) -> Self {
        Self {
            community_repo: CommunityRepository::new(pool.clone()),
            membership_repo: MembershipRepository::new(pool.clone()),
            invite_repo: InviteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a community; the creator becomes its Owner in the same
    /// transaction. Open to any authenticated user.
    pub async fn create_community(
        &self,
        actor: AuthenticatedActor,
        request: CreateCommunityRequest,
    ) -> Result<(Community, Membership)> {
        CommunityNameValidator::new().validate(&request.name)?;
        DescriptionValidator::new().validate(&request.description)?;

        let community = Community::new(
            request.name,
            request.description,
            request.visibility,
            actor.user_id.clone(),
        );
        let membership = Membership::new(community.id.clone(), actor.user_id, Role::Owner);

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let created = self.community_repo.insert_in_tx(uow.conn(), &community).await?;
        let owner = self.membership_repo.insert_in_tx(uow.conn(), &membership).await?;
        uow.commit().await?;

        info!(
            community_id = %created.id,
            owner = %owner.user_id,
            "community created"
        );

        Ok((created, owner))
    }

    /// Join a community as the lowest tier.
    ///
    /// Private communities require a valid, unexpired invite token bound to
    /// that community. There is no permission check beyond the invite gate.
    pub async fn join(
        &self,
        actor: AuthenticatedActor,
        community_id: CommunityId,
        invite_token: Option<&str>,
    ) -> Result<Membership> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let community = self
            .community_repo
            .get_for_update_in_tx(uow.conn(), &community_id)
            .await?
            .ok_or_else(|| Error::NotFound("Community not found".to_string()))?;

        if community.is_private() {
            let token = invite_token.ok_or_else(|| {
                Error::Forbidden("an invite is required to join this community".to_string())
            })?;
            self.invite_repo
                .get_valid_in_tx(uow.conn(), &community_id, token)
                .await?
                .ok_or_else(|| Error::Forbidden("invalid or expired invite".to_string()))?;
        }

        if self
            .membership_repo
            .get_in_tx(uow.conn(), &community_id, &actor.user_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "already a member of this community".to_string(),
            ));
        }

        let membership = Membership::new(community_id.clone(), actor.user_id, Role::VIEWER);
        let created = self.membership_repo.insert_in_tx(uow.conn(), &membership).await?;
        uow.commit().await?;

        debug!(community_id = %community_id, user = %created.user_id, "member joined");

        Ok(created)
    }

    /// Leave a community.
    ///
    /// Owner departure cascades the whole community. The last admin may not
    /// leave. If the departing member was the last member of any role, the
    /// orphaned community is removed in the same transaction.
    pub async fn leave(
        &self,
        actor: AuthenticatedActor,
        community_id: CommunityId,
    ) -> Result<LeaveOutcome> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        self.community_repo
            .get_for_update_in_tx(uow.conn(), &community_id)
            .await?
            .ok_or_else(|| Error::NotFound("Community not found".to_string()))?;

        let membership = self
            .membership_repo
            .get_in_tx(uow.conn(), &community_id, &actor.user_id)
            .await?
            .ok_or_else(|| Error::NotFound("not a member of this community".to_string()))?;

        // Count admins under the community row lock so two concurrent
        // departures cannot both observe a safe count.
        let admin_count = if membership.role.is_admin() {
            self.membership_repo
                .count_with_role_in_tx(uow.conn(), &community_id, Role::Admin)
                .await?
        } else {
            0
        };

        match leave_action(membership.role, admin_count) {
            LeaveAction::DeleteCommunity => {
                self.cascade_delete_in_tx(&mut uow, &community_id).await?;
                uow.commit().await?;
                info!(community_id = %community_id, "owner left; community deleted");
                Ok(LeaveOutcome::CommunityDeleted)
            }
            LeaveAction::RefuseLastAdmin => {
                uow.rollback().await?;
                Err(Error::Conflict(
                    "cannot leave as the last admin".to_string(),
                ))
            }
            LeaveAction::RemoveMembership => {
                self.membership_repo
                    .delete_in_tx(uow.conn(), &community_id, &actor.user_id)
                    .await?;

                // Orphan cleanup runs after the delete, in the same
                // transaction: a community row must not outlive its last
                // membership.
                let remaining = self
                    .membership_repo
                    .count_in_tx(uow.conn(), &community_id)
                    .await?;
                if remaining == 0 {
                    self.invite_repo
                        .delete_all_in_tx(uow.conn(), &community_id)
                        .await?;
                    self.community_repo
                        .delete_in_tx(uow.conn(), &community_id)
                        .await?;
                    uow.commit().await?;
                    info!(community_id = %community_id, "last member left; community deleted");
                    return Ok(LeaveOutcome::CommunityDeleted);
                }

                uow.commit().await?;
                debug!(community_id = %community_id, user = %actor.user_id, "member left");
                Ok(LeaveOutcome::Left)
            }
        }
    }

    /// Change a member's role.
    ///
    /// Requires CHANGE_MEMBER_ROLE (Admin or Owner). Owner standing never
    /// moves through this operation, and the last admin cannot be demoted.
    pub async fn update_member_role(
        &self,
        actor: AuthenticatedActor,
        community_id: CommunityId,
        target_user: UserId,
        new_role: Role,
    ) -> Result<Membership> {
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
        authorize(actor_role, PermissionSet(PermissionSet::CHANGE_MEMBER_ROLE))?;

        let target = self
            .membership_repo
            .get_in_tx(uow.conn(), &community_id, &target_user)
            .await?
            .ok_or_else(|| Error::NotFound("user is not a member of this community".to_string()))?;

        let admin_count = if target.role.is_admin() {
            self.membership_repo
                .count_with_role_in_tx(uow.conn(), &community_id, Role::Admin)
                .await?
        } else {
            0
        };

        check_role_change(target.role, new_role, admin_count)?;

        let updated = self
            .membership_repo
            .update_role_in_tx(uow.conn(), &community_id, &target_user, new_role)
            .await?;
        uow.commit().await?;

        info!(
            community_id = %community_id,
            target = %target_user,
            role = %new_role,
            "member role changed"
        );

        Ok(updated)
    }

    /// Delete a community and everything in it.
    ///
    /// Requires DELETE_COMMUNITY (Admin or Owner). Deleting an unknown id
    /// yields NotFound, not a silent success.
    pub async fn delete_community(
        &self,
        actor: AuthenticatedActor,
        community_id: CommunityId,
    ) -> Result<()> {
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
        authorize(actor_role, PermissionSet(PermissionSet::DELETE_COMMUNITY))?;

        self.cascade_delete_in_tx(&mut uow, &community_id).await?;
        uow.commit().await?;

        info!(community_id = %community_id, actor = %actor.user_id, "community deleted");

        Ok(())
    }

    /// Update community name, description, or visibility.
    pub async fn update_community(
        &self,
        actor: AuthenticatedActor,
        community_id: CommunityId,
        request: UpdateCommunityRequest,
    ) -> Result<Community> {
        if let Some(ref name) = request.name {
            CommunityNameValidator::new().validate(name)?;
        }
        if let Some(ref description) = request.description {
            DescriptionValidator::new().validate(description)?;
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let mut community = self
            .community_repo
            .get_for_update_in_tx(uow.conn(), &community_id)
            .await?
            .ok_or_else(|| Error::NotFound("Community not found".to_string()))?;

        let actor_role = self
            .membership_repo
            .get_in_tx(uow.conn(), &community_id, &actor.user_id)
            .await?
            .map(|m| m.role);
        authorize(actor_role, PermissionSet(PermissionSet::EDIT_COMMUNITY))?;

        if let Some(name) = request.name {
            community.name = name;
        }
        if let Some(description) = request.description {
            community.description = description;
        }
        if let Some(visibility) = request.visibility {
            community.visibility = visibility;
        }

        let updated = self.community_repo.update_in_tx(uow.conn(), &community).await?;
        uow.commit().await?;

        Ok(updated)
    }

    /// Get a community by id
    pub async fn get_community(&self, community_id: &CommunityId) -> Result<Community> {
        self.community_repo
            .get_by_id(community_id)
            .await?
            .ok_or_else(|| Error::NotFound("Community not found".to_string()))
    }

    /// A user's role in a community, if any.
    ///
    /// The gate consumed by the project/task subsystems before their own
    /// authorization checks.
    pub async fn membership_role(
        &self,
        user_id: &UserId,
        community_id: &CommunityId,
    ) -> Result<Option<Role>> {
        self.membership_repo.role_of(community_id, user_id).await
    }

    /// List a community's members with user info.
    ///
    /// Membership-scoped read: visible to members only, no permission bits
    /// involved.
    pub async fn list_members(
        &self,
        actor: &AuthenticatedActor,
        community_id: &CommunityId,
    ) -> Result<Vec<MembershipWithUser>> {
        let role = self.membership_repo.role_of(community_id, &actor.user_id).await?;
        if role.is_none() {
            return Err(Error::Forbidden(
                "not a member of this community".to_string(),
            ));
        }

        self.membership_repo.list_by_community(community_id).await
    }

    /// Member count for a community
    pub async fn count_members(&self, community_id: &CommunityId) -> Result<i64> {
        self.membership_repo.count_by_community(community_id).await
    }

    /// Communities the actor belongs to, paginated
    pub async fn list_user_communities(
        &self,
        actor: &AuthenticatedActor,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<CommunityId>, i64)> {
        self.membership_repo
            .list_by_user(&actor.user_id, page, page_size)
            .await
    }

    /// Browse public communities
    pub async fn list_public_communities(
        &self,
        query: &CommunityListQuery,
    ) -> Result<(Vec<CommunityWithCount>, i64)> {
        self.community_repo.list_public(query).await
    }

    /// Delete memberships, invites, and the community row, in that order,
    /// inside the caller's transaction. The manager issues each delete; no
    /// implicit FK cascade is assumed.
    async fn cascade_delete_in_tx(
        &self,
        uow: &mut UnitOfWork,
        community_id: &CommunityId,
    ) -> Result<()> {
        self.membership_repo
            .delete_all_in_tx(uow.conn(), community_id)
            .await?;
        self.invite_repo
            .delete_all_in_tx(uow.conn(), community_id)
            .await?;
        self.community_repo
            .delete_in_tx(uow.conn(), community_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_leave_cascades() {
        assert_eq!(leave_action(Role::Owner, 0), LeaveAction::DeleteCommunity);
    }

    #[test]
    fn test_last_admin_cannot_leave() {
        assert_eq!(leave_action(Role::Admin, 1), LeaveAction::RefuseLastAdmin);
        // a corrupt zero count must still refuse
        assert_eq!(leave_action(Role::Admin, 0), LeaveAction::RefuseLastAdmin);
    }

    #[test]
    fn test_second_admin_may_leave() {
        assert_eq!(leave_action(Role::Admin, 2), LeaveAction::RemoveMembership);
    }

    #[test]
    fn test_plain_member_leave_removes_membership() {
        for role in [
            Role::Manager,
            Role::DeveloperIii,
            Role::DeveloperIi,
            Role::DeveloperI,
        ] {
            assert_eq!(leave_action(role, 0), LeaveAction::RemoveMembership);
        }
    }

    #[test]
    fn test_owner_cannot_be_demoted() {
        let err = check_role_change(Role::Owner, Role::DeveloperI, 0).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_role_change_cannot_grant_ownership() {
        let err = check_role_change(Role::Admin, Role::Owner, 2).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let err = check_role_change(Role::DeveloperI, Role::Owner, 0).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_last_admin_cannot_be_demoted() {
        let err = check_role_change(Role::Admin, Role::Manager, 1).unwrap_err();
        match err {
            Error::Conflict(msg) => assert!(msg.contains("last admin")),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_admin_demotion_with_spare_admin_is_allowed() {
        assert!(check_role_change(Role::Admin, Role::DeveloperIi, 2).is_ok());
    }

    #[test]
    fn test_admin_to_admin_is_not_a_demotion() {
        // Overwriting Admin with Admin does not touch the count invariant
        assert!(check_role_change(Role::Admin, Role::Admin, 1).is_ok());
    }

    #[test]
    fn test_promotion_to_admin_is_allowed() {
        assert!(check_role_change(Role::DeveloperI, Role::Admin, 0).is_ok());
    }

    #[test]
    fn test_promoted_admin_cannot_demote_owner() {
        // A creates the community, B joins as viewer and is promoted to
        // Admin; B's attempt to demote A must be refused outright.
        use crate::test_helpers::{random_user_id, CommunityFixture, MembershipFixture};

        let a = random_user_id();
        let b = random_user_id();
        let community = CommunityFixture::new().with_creator(a.clone()).build();

        let owner = MembershipFixture::new()
            .with_community(community.id.clone())
            .with_user(a)
            .with_role(Role::Owner)
            .build();
        let mut joiner = MembershipFixture::new()
            .with_community(community.id)
            .with_user(b)
            .with_role(Role::VIEWER)
            .build();

        // A promotes B to Admin: allowed
        authorize(
            Some(owner.role),
            PermissionSet(PermissionSet::CHANGE_MEMBER_ROLE),
        )
        .unwrap();
        check_role_change(joiner.role, Role::Admin, 0).unwrap();
        joiner.role = Role::Admin;

        // B now holds the permission bit, but demoting the owner is refused
        authorize(
            Some(joiner.role),
            PermissionSet(PermissionSet::CHANGE_MEMBER_ROLE),
        )
        .unwrap();
        let err = check_role_change(owner.role, Role::VIEWER, 0).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_two_admin_departure_sequence() {
        // X and Y are the only admins. X leaves (fine), then Y must be
        // refused as the last admin.
        use crate::test_helpers::{random_user_id, test_community_id, MembershipFixture};

        let community_id = test_community_id("community002");
        let x = MembershipFixture::new()
            .with_community(community_id.clone())
            .with_user(random_user_id())
            .with_role(Role::Admin)
            .build();
        let y = MembershipFixture::new()
            .with_community(community_id)
            .with_user(random_user_id())
            .with_role(Role::Admin)
            .build();

        assert_eq!(leave_action(x.role, 2), LeaveAction::RemoveMembership);
        // X is gone; Y is alone now
        assert_eq!(leave_action(y.role, 1), LeaveAction::RefuseLastAdmin);
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_create_community() {
        // Integration test placeholder
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_concurrent_admin_departures_serialize() {
        // Integration test placeholder
    }
}
