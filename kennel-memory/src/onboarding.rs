use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kennel_core::errors::KennelError;
use kennel_core::models::OnboardingState;
use kennel_core::services::OnboardingService;
use kennel_core::tenant::TenantContext;

use crate::store::{ops, MemoryState, MemoryStore};

pub struct MemoryOnboarding {
    pub store: Arc<MemoryStore>,
}

fn state_mut<'a>(
    state: &'a mut MemoryState,
    ctx: &TenantContext,
) -> Result<&'a mut OnboardingState> {
    state.onboarding.get_mut(&ctx.workspace_id()).ok_or_else(|| {
        KennelError::not_found(format!("No onboarding state for workspace {}", ctx.workspace_id()))
            .into_anyhow()
    })
}

#[async_trait]
impl OnboardingService for MemoryOnboarding {
    async fn state(&self, ctx: &TenantContext) -> Result<OnboardingState> {
        self.store.faults.check(ops::ONBOARDING_STATE).await?;
        let mut state = self.store.state.write().await;
        state_mut(&mut state, ctx).map(|s| *s)
    }

    async fn set_invite_team_pending(&self, ctx: &TenantContext, value: bool) -> Result<()> {
        self.store.faults.check(ops::SET_INVITE_TEAM).await?;
        let mut state = self.store.state.write().await;
        state_mut(&mut state, ctx)?.invite_team_pending = value;
        Ok(())
    }

    async fn set_book_onboarding_pending(&self, ctx: &TenantContext, value: bool) -> Result<()> {
        self.store.faults.check(ops::SET_BOOK_ONBOARDING).await?;
        let mut state = self.store.state.write().await;
        state_mut(&mut state, ctx)?.book_onboarding_pending = value;
        Ok(())
    }
}
