use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kennel_core::models::RoleAssignment;
use kennel_core::services::UserRoleService;
use kennel_core::tenant::TenantContext;
use uuid::Uuid;

use crate::store::{ops, MemoryStore};

pub struct MemoryUserRoles {
    pub store: Arc<MemoryStore>,
}

#[async_trait]
impl UserRoleService for MemoryUserRoles {
    async fn role_of(&self, ctx: &TenantContext, user_workspace_id: Uuid) -> Result<Option<Uuid>> {
        self.store.faults.check(ops::ROLE_OF).await?;

        let state = self.store.state.read().await;
        state.membership_in(ctx.workspace_id(), user_workspace_id)?;
        Ok(state.role_assignments.get(&user_workspace_id).map(|a| a.role_id))
    }

    async fn assign_role(
        &self,
        ctx: &TenantContext,
        user_workspace_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<Uuid>> {
        self.store.faults.check(ops::ASSIGN_ROLE).await?;

        let workspace_id = ctx.workspace_id();
        let mut state = self.store.state.write().await;
        state.membership_in(workspace_id, user_workspace_id)?;
        state.role_in(workspace_id, role_id)?;

        let previous = state.role_assignments.insert(
            user_workspace_id,
            RoleAssignment {
                user_workspace_id,
                role_id,
                workspace_id,
            },
        );
        Ok(previous.map(|a| a.role_id))
    }

    async fn unassign(&self, ctx: &TenantContext, user_workspace_id: Uuid) -> Result<()> {
        self.store.faults.check(ops::UNASSIGN_ROLE).await?;

        let mut state = self.store.state.write().await;
        state.membership_in(ctx.workspace_id(), user_workspace_id)?;
        state.role_assignments.remove(&user_workspace_id);
        Ok(())
    }
}
