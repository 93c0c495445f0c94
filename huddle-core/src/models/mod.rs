pub mod community;
pub mod id;
pub mod invite;
pub mod membership;
pub mod role;

pub use community::{
    Community, CommunityListQuery, CommunityWithCount, CreateCommunityRequest,
    UpdateCommunityRequest, Visibility,
};
pub use id::{generate_id, CommunityId, InviteId, UserId};
pub use invite::{Invite, IssuedInvite};
pub use membership::{Membership, MembershipWithUser};
pub use role::{PermissionSet, Role};
