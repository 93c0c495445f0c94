//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    service::{CommunityService, InviteService},
    Config,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Community and membership lifecycle service
    pub community_service: Arc<CommunityService>,
    /// Invite issuing service
    pub invite_service: Arc<InviteService>,
}

/// Initialize all core services
///
/// The pool is the single injected storage handle; every service shares it
/// and nothing else writes to the core tables.
pub fn init_services(pool: PgPool, config: &Config) -> Services {
    info!("Initializing services...");

    let community_service = Arc::new(CommunityService::new(pool.clone()));
    let invite_service = Arc::new(InviteService::new(pool, config.invite.clone()));

    info!("Services initialized");

    Services {
        community_service,
        invite_service,
    }
}

#[cfg(test)]
mod tests {

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_init_services() {
        // Integration test placeholder
    }
}
