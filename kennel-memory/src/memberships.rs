use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kennel_core::errors::KennelError;
use kennel_core::models::{MembershipChange, User, UserWorkspace};
use kennel_core::services::MembershipService;
use kennel_core::tenant::TenantContext;
use uuid::Uuid;

use crate::store::{ops, MemoryStore};

pub struct MemoryMemberships {
    pub store: Arc<MemoryStore>,
}

#[async_trait]
impl MembershipService for MemoryMemberships {
    async fn user_workspace_or_throw(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
    ) -> Result<UserWorkspace> {
        self.store.faults.check(ops::USER_WORKSPACE).await?;
        self.store
            .state
            .read()
            .await
            .membership_of(ctx.workspace_id(), user_id)
            .cloned()
            .ok_or_else(|| {
                KennelError::not_found(format!("User {user_id} is not a member of this workspace"))
                    .into_anyhow()
            })
    }

    async fn add_user_if_not_member(
        &self,
        ctx: &TenantContext,
        user: &User,
        role_id: Uuid,
    ) -> Result<MembershipChange> {
        self.store.faults.check(ops::ADD_MEMBER).await?;

        let workspace_id = ctx.workspace_id();
        let mut state = self.store.state.write().await;
        if let Some(existing) = state.membership_of(workspace_id, user.id) {
            return Ok(MembershipChange {
                user_workspace: existing.clone(),
                created: false,
            });
        }

        if !state.users.contains_key(&user.id) {
            return Err(KennelError::not_found(format!("User {} not found", user.id)).into_anyhow());
        }
        state.workspace(workspace_id)?;
        state.role_in(workspace_id, role_id)?;

        let user_workspace = state.insert_membership(workspace_id, user.id, role_id);
        Ok(MembershipChange {
            user_workspace,
            created: true,
        })
    }

    async fn remove(&self, ctx: &TenantContext, user_workspace_id: Uuid) -> Result<()> {
        self.store.faults.check(ops::REMOVE_MEMBER).await?;

        let mut state = self.store.state.write().await;
        state.membership_in(ctx.workspace_id(), user_workspace_id)?;
        state.memberships.remove(&user_workspace_id);
        state.role_assignments.remove(&user_workspace_id);
        Ok(())
    }
}
