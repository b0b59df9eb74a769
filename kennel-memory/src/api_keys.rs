use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use kennel_auth::ApiTokenIssuer;
use kennel_core::errors::KennelError;
use kennel_core::models::{ApiKey, ApiToken, NewApiKey};
use kennel_core::services::ApiKeyService;
use kennel_core::tenant::TenantContext;
use uuid::Uuid;

use crate::store::{ops, MemoryStore};

pub struct MemoryApiKeys {
    pub store: Arc<MemoryStore>,
    pub issuer: ApiTokenIssuer,
}

#[async_trait]
impl ApiKeyService for MemoryApiKeys {
    async fn create(&self, ctx: &TenantContext, key: NewApiKey) -> Result<ApiKey> {
        self.store.faults.check(ops::CREATE_API_KEY).await?;

        let now = Utc::now();
        if key.expires_at <= now {
            return Err(
                KennelError::bad_request("API key expiry must be in the future").into_anyhow(),
            );
        }

        let workspace_id = ctx.workspace_id();
        let mut state = self.store.state.write().await;
        state.role_in(workspace_id, key.role_id)?;

        let api_key = ApiKey {
            id: Uuid::new_v4(),
            name: key.name,
            workspace_id,
            role_id: key.role_id,
            expires_at: key.expires_at,
            revoked_at: None,
            created_at: now,
        };
        state.api_keys.insert(api_key.id, api_key.clone());
        Ok(api_key)
    }

    async fn generate_token(&self, ctx: &TenantContext, api_key_id: Uuid) -> Result<ApiToken> {
        self.store.faults.check(ops::GENERATE_TOKEN).await?;

        let api_key = self
            .store
            .state
            .read()
            .await
            .api_keys
            .get(&api_key_id)
            .filter(|k| k.workspace_id == ctx.workspace_id())
            .cloned()
            .ok_or_else(|| {
                KennelError::not_found(format!("API key {api_key_id} not found")).into_anyhow()
            })?;

        if !api_key.is_active_at(Utc::now()) {
            return Err(KennelError::forbidden("API key is revoked or expired").into_anyhow());
        }

        let token = self
            .issuer
            .issue(api_key.workspace_id, api_key.id, api_key.expires_at)?;
        Ok(ApiToken { token })
    }

    async fn revoke(&self, ctx: &TenantContext, api_key_id: Uuid) -> Result<()> {
        self.store.faults.check(ops::REVOKE_API_KEY).await?;

        let mut state = self.store.state.write().await;
        let api_key = state
            .api_keys
            .get_mut(&api_key_id)
            .filter(|k| k.workspace_id == ctx.workspace_id())
            .ok_or_else(|| {
                KennelError::not_found(format!("API key {api_key_id} not found")).into_anyhow()
            })?;
        if api_key.revoked_at.is_none() {
            api_key.revoked_at = Some(Utc::now());
        }
        Ok(())
    }
}
