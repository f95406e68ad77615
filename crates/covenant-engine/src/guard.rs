//! Access/Ownership Guard
//!
//! A single administrator identity, set at construction and transferable
//! only by the current administrator. Gates parameter updates, fee-balance
//! recovery, and stuck-request cancellation.

use covenant_types::{CovenantError, PartyId, Result};
use tokio::sync::RwLock;
use tracing::info;

/// Restricts privileged operations to the designated administrator
pub struct AdminGuard {
    admin: RwLock<PartyId>,
}

impl AdminGuard {
    pub fn new(admin: PartyId) -> Self {
        Self {
            admin: RwLock::new(admin),
        }
    }

    /// Fail unless the caller is the current administrator
    pub async fn ensure(&self, caller: &PartyId) -> Result<()> {
        if *self.admin.read().await != *caller {
            return Err(CovenantError::unauthorized(
                "caller is not the administrator",
            ));
        }
        Ok(())
    }

    /// Hand administration to a new identity
    pub async fn transfer(&self, caller: &PartyId, new_admin: PartyId) -> Result<()> {
        let mut admin = self.admin.write().await;
        if *admin != *caller {
            return Err(CovenantError::unauthorized(
                "caller is not the administrator",
            ));
        }
        info!(from = %admin, to = %new_admin, "administrator transferred");
        *admin = new_admin;
        Ok(())
    }

    /// The current administrator
    pub async fn admin(&self) -> PartyId {
        self.admin.read().await.clone()
    }
}
