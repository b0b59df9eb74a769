//! Multi-tenant context.
//!
//! In Kennel a tenant is a workspace, so the tenant id is the workspace id.

use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantId(pub Uuid);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Context carried with every tenant-scoped collaborator call.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(workspace_id: Uuid) -> Self {
        Self {
            tenant_id: TenantId(workspace_id),
        }
    }

    pub fn workspace_id(&self) -> Uuid {
        self.tenant_id.0
    }
}
