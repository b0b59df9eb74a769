//! kennel-memory: in-memory collaborators.
//!
//! Every collaborator of the bootstrap saga backed by one shared
//! [`MemoryStore`]. Used by the server binary and by tests; a
//! [`FaultPlan`] on the store makes any operation fail on demand.

pub mod accounts;
pub mod api_keys;
pub mod memberships;
pub mod onboarding;
pub mod roles;
pub mod store;
pub mod user_roles;
pub mod workspaces;

use std::sync::Arc;

use kennel_auth::ApiTokenIssuer;
use kennel_core::Collaborators;

pub use accounts::MemoryAccounts;
pub use api_keys::MemoryApiKeys;
pub use memberships::MemoryMemberships;
pub use onboarding::MemoryOnboarding;
pub use roles::MemoryRoles;
pub use store::{ops, FaultPlan, MemoryState, MemoryStore, SeededRoles};
pub use user_roles::MemoryUserRoles;
pub use workspaces::MemoryWorkspaces;

#[derive(Clone)]
pub struct MemoryBackend {
    pub store: Arc<MemoryStore>,
    pub issuer: ApiTokenIssuer,
}

impl MemoryBackend {
    pub fn new(store: Arc<MemoryStore>, issuer: ApiTokenIssuer) -> Self {
        Self { store, issuer }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            accounts: Arc::new(MemoryAccounts {
                store: self.store.clone(),
            }),
            workspaces: Arc::new(MemoryWorkspaces {
                store: self.store.clone(),
            }),
            roles: Arc::new(MemoryRoles {
                store: self.store.clone(),
            }),
            memberships: Arc::new(MemoryMemberships {
                store: self.store.clone(),
            }),
            user_roles: Arc::new(MemoryUserRoles {
                store: self.store.clone(),
            }),
            onboarding: Arc::new(MemoryOnboarding {
                store: self.store.clone(),
            }),
            api_keys: Arc::new(MemoryApiKeys {
                store: self.store.clone(),
                issuer: self.issuer.clone(),
            }),
        }
    }
}
