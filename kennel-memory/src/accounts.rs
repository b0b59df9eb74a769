use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kennel_core::models::{NewUser, OnboardingState, SignUpResult, User};
use kennel_core::services::AccountService;
use tracing::debug;
use uuid::Uuid;

use crate::store::{ops, MemoryStore};

pub struct MemoryAccounts {
    pub store: Arc<MemoryStore>,
}

#[async_trait]
impl AccountService for MemoryAccounts {
    async fn sign_up_on_new_workspace(&self, user: NewUser) -> Result<SignUpResult> {
        self.store.faults.check(ops::SIGN_UP).await?;

        let workspace = self.store.new_workspace();
        let mut state = self.store.state.write().await;
        let user = state.insert_user(user)?;

        state.workspaces.insert(workspace.id, workspace.clone());
        let admin_id = state.seed_roles(workspace.id, self.store.seeded_roles());
        state.insert_membership(workspace.id, user.id, admin_id);
        state
            .onboarding
            .insert(workspace.id, OnboardingState::fresh(workspace.id));

        debug!(user_id = %user.id, workspace_id = %workspace.id, "memory sign up");
        Ok(SignUpResult { user, workspace })
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.faults.check(ops::USER_BY_EMAIL).await?;
        Ok(self.store.state.read().await.user_by_email(email).cloned())
    }

    async fn remove_sign_up(&self, user_id: Uuid, workspace_id: Uuid) -> Result<()> {
        self.store.faults.check(ops::REMOVE_SIGN_UP).await?;

        let mut state = self.store.state.write().await;
        state.purge_workspace(workspace_id);
        let still_member = state.memberships.values().any(|m| m.user_id == user_id);
        if !still_member {
            state.users.remove(&user_id);
        }
        Ok(())
    }
}
