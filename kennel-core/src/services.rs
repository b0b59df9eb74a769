use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    ApiKey, ApiToken, MembershipChange, NewApiKey, NewUser, OnboardingState, Role,
    RolePermissions, SignUpResult, User, UserWorkspace, Workspace, WorkspacePatch,
};
use crate::tenant::TenantContext;

/// Identity/account collaborator: creates users together with their first
/// workspace and looks accounts up by email.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Create a user and a workspace in one call. The workspace starts in
    /// `PendingCreation`, already seeded with its default roles, a
    /// membership for the user and a fresh onboarding state.
    async fn sign_up_on_new_workspace(&self, user: NewUser) -> Result<SignUpResult>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Undo a sign up: drop the workspace, everything scoped to it and the
    /// user when it has no other membership left.
    async fn remove_sign_up(&self, user_id: Uuid, workspace_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn get(&self, ctx: &TenantContext) -> Result<Workspace>;

    async fn activate(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        display_name: &str,
    ) -> Result<Workspace>;

    async fn deactivate(&self, ctx: &TenantContext) -> Result<Workspace>;

    /// `user_workspace_id` identifies the membership the change is made on
    /// behalf of.
    async fn update(
        &self,
        ctx: &TenantContext,
        user_workspace_id: Uuid,
        patch: WorkspacePatch,
    ) -> Result<Workspace>;
}

/// Role catalog of a workspace.
#[async_trait]
pub trait RoleService: Send + Sync {
    async fn workspace_roles(&self, ctx: &TenantContext) -> Result<Vec<Role>>;

    async fn update_role(
        &self,
        ctx: &TenantContext,
        role_id: Uuid,
        permissions: RolePermissions,
    ) -> Result<Role>;
}

#[async_trait]
pub trait MembershipService: Send + Sync {
    /// Fails with `NotFound` when the user is not a member.
    async fn user_workspace_or_throw(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
    ) -> Result<UserWorkspace>;

    /// Adds `user` with `role_id` unless it is already a member; existing
    /// memberships are returned untouched.
    async fn add_user_if_not_member(
        &self,
        ctx: &TenantContext,
        user: &User,
        role_id: Uuid,
    ) -> Result<MembershipChange>;

    async fn remove(&self, ctx: &TenantContext, user_workspace_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserRoleService: Send + Sync {
    async fn role_of(&self, ctx: &TenantContext, user_workspace_id: Uuid) -> Result<Option<Uuid>>;

    /// Replace the role of a membership. Returns the role it had before.
    async fn assign_role(
        &self,
        ctx: &TenantContext,
        user_workspace_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<Uuid>>;

    async fn unassign(&self, ctx: &TenantContext, user_workspace_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait OnboardingService: Send + Sync {
    async fn state(&self, ctx: &TenantContext) -> Result<OnboardingState>;

    async fn set_invite_team_pending(&self, ctx: &TenantContext, value: bool) -> Result<()>;

    async fn set_book_onboarding_pending(&self, ctx: &TenantContext, value: bool) -> Result<()>;
}

/// Credential issuance.
#[async_trait]
pub trait ApiKeyService: Send + Sync {
    async fn create(&self, ctx: &TenantContext, key: NewApiKey) -> Result<ApiKey>;

    /// Derive the bearer token for an existing, non-revoked key.
    async fn generate_token(&self, ctx: &TenantContext, api_key_id: Uuid) -> Result<ApiToken>;

    async fn revoke(&self, ctx: &TenantContext, api_key_id: Uuid) -> Result<()>;
}

/// Every collaborator the bootstrap flow needs.
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountService>,
    pub workspaces: Arc<dyn WorkspaceService>,
    pub roles: Arc<dyn RoleService>,
    pub memberships: Arc<dyn MembershipService>,
    pub user_roles: Arc<dyn UserRoleService>,
    pub onboarding: Arc<dyn OnboardingService>,
    pub api_keys: Arc<dyn ApiKeyService>,
}
