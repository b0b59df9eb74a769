//! The bootstrap steps, in execution order.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::context::BootstrapContext;
use crate::errors::KennelError;
use crate::models::{ActivationStatus, NewApiKey, RolePermissions, WorkspacePatch};
use crate::saga::SagaStep;
use crate::services::{
    AccountService, ApiKeyService, MembershipService, OnboardingService, RoleService,
    UserRoleService, WorkspaceService,
};
use crate::urls::WorkspaceUrlBuilder;

pub const SIGN_UP: &str = "sign-up";
pub const ACTIVATE_WORKSPACE: &str = "activate-workspace";
pub const RESOLVE_DEFAULT_ROLES: &str = "resolve-default-roles";
pub const RESTRICT_MEMBER_ROLE: &str = "restrict-member-role";
pub const RESOLVE_MEMBERSHIP: &str = "resolve-membership";
pub const APPLY_WORKSPACE_DEFAULTS: &str = "apply-workspace-defaults";
pub const ATTACH_SUPPORT_ADMIN: &str = "attach-support-admin";
pub const ASSIGN_MEMBER_ROLE: &str = "assign-member-role";
pub const COMPLETE_ONBOARDING: &str = "complete-onboarding";
pub const ISSUE_API_CREDENTIAL: &str = "issue-api-credential";
pub const RESOLVE_WORKSPACE_URLS: &str = "resolve-workspace-urls";

/// Creates the user with a workspace in `PendingCreation`.
pub struct SignUp {
    pub accounts: Arc<dyn AccountService>,
}

#[async_trait]
impl SagaStep<BootstrapContext> for SignUp {
    fn name(&self) -> &'static str {
        SIGN_UP
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        if ctx.user.is_some() {
            return Ok(());
        }
        let created = self.accounts.sign_up_on_new_workspace(ctx.input.new_user()).await?;
        info!(
            user_id = %created.user.id,
            workspace_id = %created.workspace.id,
            "user signed up on new workspace"
        );
        ctx.user = Some(created.user);
        ctx.workspace = Some(created.workspace);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        if let (Some(user), Some(workspace)) = (ctx.user.take(), ctx.workspace.take()) {
            self.accounts.remove_sign_up(user.id, workspace.id).await?;
            debug!(user_id = %user.id, workspace_id = %workspace.id, "sign up removed");
        }
        Ok(())
    }
}

pub struct ActivateWorkspace {
    pub workspaces: Arc<dyn WorkspaceService>,
}

#[async_trait]
impl SagaStep<BootstrapContext> for ActivateWorkspace {
    fn name(&self) -> &'static str {
        ACTIVATE_WORKSPACE
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        let user_id = ctx.user()?.id;
        let workspace = self
            .workspaces
            .activate(&tenant, user_id, &ctx.input.workspace_name)
            .await?;
        ctx.workspace = Some(workspace);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let active = ctx
            .workspace
            .as_ref()
            .is_some_and(|w| w.activation_status == ActivationStatus::Active);
        if active {
            let workspace = self.workspaces.deactivate(&ctx.tenant()?).await?;
            ctx.workspace = Some(workspace);
        }
        Ok(())
    }
}

/// Looks up the Admin and Member roles seeded with the workspace. Read only.
pub struct ResolveDefaultRoles {
    pub roles: Arc<dyn RoleService>,
    pub admin_label: String,
    pub member_label: String,
}

#[async_trait]
impl SagaStep<BootstrapContext> for ResolveDefaultRoles {
    fn name(&self) -> &'static str {
        RESOLVE_DEFAULT_ROLES
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let roles = self.roles.workspace_roles(&ctx.tenant()?).await?;
        let admin = roles.iter().find(|r| r.label == self.admin_label).cloned();
        let member = roles.iter().find(|r| r.label == self.member_label).cloned();

        match (admin, member) {
            (Some(admin), Some(member)) => {
                ctx.admin_role = Some(admin);
                ctx.member_role = Some(member);
                Ok(())
            }
            (admin, member) => {
                let mut missing = Vec::new();
                if admin.is_none() {
                    missing.push(self.admin_label.as_str());
                }
                if member.is_none() {
                    missing.push(self.member_label.as_str());
                }
                Err(KennelError::general_error("Default roles not found")
                    .with_data(json!({ "missing": missing }))
                    .into_anyhow())
            }
        }
    }
}

pub struct RestrictMemberRole {
    pub roles: Arc<dyn RoleService>,
    pub permissions: RolePermissions,
}

#[async_trait]
impl SagaStep<BootstrapContext> for RestrictMemberRole {
    fn name(&self) -> &'static str {
        RESTRICT_MEMBER_ROLE
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        let (member_id, current) = {
            let member = ctx.member_role()?;
            (member.id, member.permissions)
        };
        if ctx.member_permissions_before.is_none() {
            ctx.member_permissions_before = Some(current);
        }

        let updated = self
            .roles
            .update_role(&tenant, member_id, self.permissions)
            .await?;
        ctx.member_role = Some(updated);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let Some(before) = ctx.member_permissions_before else {
            return Ok(());
        };
        let member_id = ctx.member_role()?.id;
        let restored = self.roles.update_role(&ctx.tenant()?, member_id, before).await?;
        ctx.member_role = Some(restored);
        ctx.member_permissions_before = None;
        Ok(())
    }
}

/// Looks up the founder's membership. Read only.
pub struct ResolveMembership {
    pub memberships: Arc<dyn MembershipService>,
}

#[async_trait]
impl SagaStep<BootstrapContext> for ResolveMembership {
    fn name(&self) -> &'static str {
        RESOLVE_MEMBERSHIP
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let user_id = ctx.user()?.id;
        let user_workspace = self
            .memberships
            .user_workspace_or_throw(&ctx.tenant()?, user_id)
            .await?;
        ctx.user_workspace = Some(user_workspace);
        Ok(())
    }
}

/// Sets the display name and makes Member the default role of the workspace.
pub struct ApplyWorkspaceDefaults {
    pub workspaces: Arc<dyn WorkspaceService>,
}

#[async_trait]
impl SagaStep<BootstrapContext> for ApplyWorkspaceDefaults {
    fn name(&self) -> &'static str {
        APPLY_WORKSPACE_DEFAULTS
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        let user_workspace_id = ctx.user_workspace()?.id;
        let member_id = ctx.member_role()?.id;
        if ctx.workspace_before_defaults.is_none() {
            ctx.workspace_before_defaults = Some(self.workspaces.get(&tenant).await?);
        }

        let patch = WorkspacePatch {
            display_name: Some(Some(ctx.input.workspace_name.clone())),
            default_role_id: Some(Some(member_id)),
        };
        let workspace = self.workspaces.update(&tenant, user_workspace_id, patch).await?;
        ctx.workspace = Some(workspace);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let Some(before) = ctx.workspace_before_defaults.take() else {
            return Ok(());
        };
        let user_workspace_id = ctx.user_workspace()?.id;
        let workspace = self
            .workspaces
            .update(&ctx.tenant()?, user_workspace_id, WorkspacePatch::restore(&before))
            .await?;
        ctx.workspace = Some(workspace);
        Ok(())
    }
}

/// Makes the support account an Admin member of the workspace.
pub struct AttachSupportAdmin {
    pub accounts: Arc<dyn AccountService>,
    pub memberships: Arc<dyn MembershipService>,
    pub support_email: String,
}

#[async_trait]
impl SagaStep<BootstrapContext> for AttachSupportAdmin {
    fn name(&self) -> &'static str {
        ATTACH_SUPPORT_ADMIN
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        let admin_id = ctx.admin_role()?.id;
        let support = self
            .accounts
            .user_by_email(&self.support_email)
            .await?
            .ok_or_else(|| {
                KennelError::not_found(format!("Support account {} not found", self.support_email))
                    .into_anyhow()
            })?;

        let change = self
            .memberships
            .add_user_if_not_member(&tenant, &support, admin_id)
            .await?;
        debug!(support_user_id = %support.id, created = change.created, "support admin attached");

        // A retry must not forget that an earlier attempt created the membership.
        let created_before = ctx.support_membership.as_ref().is_some_and(|m| m.created);
        if !created_before {
            ctx.support_membership = Some(change);
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        match ctx.support_membership.take() {
            Some(change) if change.created => {
                self.memberships
                    .remove(&ctx.tenant()?, change.user_workspace.id)
                    .await
            }
            _ => Ok(()),
        }
    }
}

/// Gives the founder the Member role.
pub struct AssignMemberRole {
    pub user_roles: Arc<dyn UserRoleService>,
}

#[async_trait]
impl SagaStep<BootstrapContext> for AssignMemberRole {
    fn name(&self) -> &'static str {
        ASSIGN_MEMBER_ROLE
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        let user_workspace_id = ctx.user_workspace()?.id;
        let member_id = ctx.member_role()?.id;

        let previous = self
            .user_roles
            .assign_role(&tenant, user_workspace_id, member_id)
            .await?;
        if ctx.member_assignment_before.is_none() {
            ctx.member_assignment_before = Some(previous);
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let Some(previous) = ctx.member_assignment_before.take() else {
            return Ok(());
        };
        let tenant = ctx.tenant()?;
        let user_workspace_id = ctx.user_workspace()?.id;
        match previous {
            Some(role_id) => {
                self.user_roles
                    .assign_role(&tenant, user_workspace_id, role_id)
                    .await?;
            }
            None => self.user_roles.unassign(&tenant, user_workspace_id).await?,
        }
        Ok(())
    }
}

/// Clears both pending onboarding flags.
pub struct CompleteOnboarding {
    pub onboarding: Arc<dyn OnboardingService>,
}

#[async_trait]
impl SagaStep<BootstrapContext> for CompleteOnboarding {
    fn name(&self) -> &'static str {
        COMPLETE_ONBOARDING
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        if ctx.onboarding_before.is_none() {
            ctx.onboarding_before = Some(self.onboarding.state(&tenant).await?);
        }
        self.onboarding.set_invite_team_pending(&tenant, false).await?;
        self.onboarding.set_book_onboarding_pending(&tenant, false).await?;
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let Some(before) = ctx.onboarding_before.take() else {
            return Ok(());
        };
        let tenant = ctx.tenant()?;
        self.onboarding
            .set_invite_team_pending(&tenant, before.invite_team_pending)
            .await?;
        self.onboarding
            .set_book_onboarding_pending(&tenant, before.book_onboarding_pending)
            .await?;
        Ok(())
    }
}

/// Creates the long-lived Admin API key and derives its token.
pub struct IssueApiCredential {
    pub api_keys: Arc<dyn ApiKeyService>,
    pub key_name: String,
    pub lifetime: Duration,
}

#[async_trait]
impl SagaStep<BootstrapContext> for IssueApiCredential {
    fn name(&self) -> &'static str {
        ISSUE_API_CREDENTIAL
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let tenant = ctx.tenant()?;
        if ctx.api_key.is_none() {
            let new_key = NewApiKey {
                name: self.key_name.clone(),
                role_id: ctx.admin_role()?.id,
                expires_at: ctx.expires_at(self.lifetime)?,
            };
            ctx.api_key = Some(self.api_keys.create(&tenant, new_key).await?);
        }

        let api_key_id = ctx.api_key()?.id;
        let token = self.api_keys.generate_token(&tenant, api_key_id).await?;
        info!(api_key_id = %api_key_id, "API credential issued");
        ctx.api_token = Some(token);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut BootstrapContext) -> Result<()> {
        ctx.api_token = None;
        if let Some(key) = ctx.api_key.take() {
            self.api_keys.revoke(&ctx.tenant()?, key.id).await?;
        }
        Ok(())
    }
}

/// Derives the public URLs of the workspace. Pure, runs last so that a bad
/// subdomain still unwinds everything before it.
pub struct ResolveWorkspaceUrls {
    pub urls: WorkspaceUrlBuilder,
}

#[async_trait]
impl SagaStep<BootstrapContext> for ResolveWorkspaceUrls {
    fn name(&self) -> &'static str {
        RESOLVE_WORKSPACE_URLS
    }

    async fn execute(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let urls = self.urls.workspace_urls(ctx.workspace()?)?;
        ctx.workspace_urls = Some(urls);
        Ok(())
    }
}
