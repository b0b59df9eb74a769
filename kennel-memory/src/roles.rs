use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kennel_core::errors::KennelError;
use kennel_core::models::{Role, RolePermissions};
use kennel_core::services::RoleService;
use kennel_core::tenant::TenantContext;
use uuid::Uuid;

use crate::store::{ops, MemoryStore};

pub struct MemoryRoles {
    pub store: Arc<MemoryStore>,
}

#[async_trait]
impl RoleService for MemoryRoles {
    async fn workspace_roles(&self, ctx: &TenantContext) -> Result<Vec<Role>> {
        self.store.faults.check(ops::WORKSPACE_ROLES).await?;
        Ok(self.store.state.read().await.roles_of_workspace(ctx.workspace_id()))
    }

    async fn update_role(
        &self,
        ctx: &TenantContext,
        role_id: Uuid,
        permissions: RolePermissions,
    ) -> Result<Role> {
        self.store.faults.check(ops::UPDATE_ROLE).await?;

        let mut state = self.store.state.write().await;
        if !state.role_in(ctx.workspace_id(), role_id)?.is_editable {
            return Err(
                KennelError::forbidden(format!("Role {role_id} is not editable")).into_anyhow(),
            );
        }
        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| {
                KennelError::not_found(format!("Role {role_id} not found")).into_anyhow()
            })?;
        role.permissions = permissions;
        Ok(role.clone())
    }
}
