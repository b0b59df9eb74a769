use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kennel_core::errors::KennelError;
use kennel_core::models::{ActivationStatus, Workspace, WorkspacePatch};
use kennel_core::services::WorkspaceService;
use kennel_core::tenant::TenantContext;
use uuid::Uuid;

use crate::store::{ops, MemoryStore};

pub struct MemoryWorkspaces {
    pub store: Arc<MemoryStore>,
}

#[async_trait]
impl WorkspaceService for MemoryWorkspaces {
    async fn get(&self, ctx: &TenantContext) -> Result<Workspace> {
        self.store.faults.check(ops::GET_WORKSPACE).await?;
        self.store
            .state
            .read()
            .await
            .workspace(ctx.workspace_id())
            .cloned()
    }

    async fn activate(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        display_name: &str,
    ) -> Result<Workspace> {
        self.store.faults.check(ops::ACTIVATE_WORKSPACE).await?;

        let mut state = self.store.state.write().await;
        if state.membership_of(ctx.workspace_id(), user_id).is_none() {
            return Err(
                KennelError::forbidden("Only a member can activate the workspace").into_anyhow(),
            );
        }

        let workspace = state.workspace_mut(ctx.workspace_id())?;
        if workspace.activation_status == ActivationStatus::Inactive {
            return Err(KennelError::bad_request("Workspace is inactive").into_anyhow());
        }
        workspace.activation_status = ActivationStatus::Active;
        workspace.display_name = Some(display_name.to_string());
        Ok(workspace.clone())
    }

    async fn deactivate(&self, ctx: &TenantContext) -> Result<Workspace> {
        self.store.faults.check(ops::DEACTIVATE_WORKSPACE).await?;

        let mut state = self.store.state.write().await;
        let workspace = state.workspace_mut(ctx.workspace_id())?;
        workspace.activation_status = ActivationStatus::Inactive;
        Ok(workspace.clone())
    }

    async fn update(
        &self,
        ctx: &TenantContext,
        user_workspace_id: Uuid,
        patch: WorkspacePatch,
    ) -> Result<Workspace> {
        self.store.faults.check(ops::UPDATE_WORKSPACE).await?;

        let workspace_id = ctx.workspace_id();
        let mut state = self.store.state.write().await;
        state.membership_in(workspace_id, user_workspace_id)?;
        if let Some(Some(role_id)) = patch.default_role_id {
            state.role_in(workspace_id, role_id).map_err(|_| {
                KennelError::bad_request(format!("Role {role_id} does not belong to the workspace"))
                    .into_anyhow()
            })?;
        }

        let workspace = state.workspace_mut(workspace_id)?;
        patch.apply(workspace);
        Ok(workspace.clone())
    }
}
