use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::CreateUserAndWorkspace;
use crate::errors::KennelError;
use crate::models::{
    ApiKey, ApiToken, MembershipChange, OnboardingState, Role, RolePermissions, User,
    UserWorkspace, Workspace, WorkspaceUrls,
};
use crate::tenant::TenantContext;

/// State threaded through the bootstrap steps.
///
/// Each step fills in what it produced and, for the ones that overwrite
/// existing data, what was there before so that its compensation can put it
/// back.
#[derive(Debug)]
pub struct BootstrapContext {
    pub input: CreateUserAndWorkspace,
    pub issued_at: DateTime<Utc>,

    pub user: Option<User>,
    pub workspace: Option<Workspace>,
    pub admin_role: Option<Role>,
    pub member_role: Option<Role>,
    pub member_permissions_before: Option<RolePermissions>,
    pub user_workspace: Option<UserWorkspace>,
    pub workspace_before_defaults: Option<Workspace>,
    pub support_membership: Option<MembershipChange>,
    /// Outer `Some` once the Member role was assigned; inner value is the
    /// role the membership had before.
    pub member_assignment_before: Option<Option<Uuid>>,
    pub onboarding_before: Option<OnboardingState>,
    pub api_key: Option<ApiKey>,
    pub api_token: Option<ApiToken>,
    pub workspace_urls: Option<WorkspaceUrls>,
}

fn out_of_order(what: &str) -> anyhow::Error {
    KennelError::general_error(format!("Bootstrap step ran before {what} was resolved"))
        .into_anyhow()
}

impl BootstrapContext {
    pub fn new(input: CreateUserAndWorkspace, issued_at: DateTime<Utc>) -> Self {
        Self {
            input,
            issued_at,
            user: None,
            workspace: None,
            admin_role: None,
            member_role: None,
            member_permissions_before: None,
            user_workspace: None,
            workspace_before_defaults: None,
            support_membership: None,
            member_assignment_before: None,
            onboarding_before: None,
            api_key: None,
            api_token: None,
            workspace_urls: None,
        }
    }

    pub fn tenant(&self) -> Result<TenantContext> {
        Ok(TenantContext::new(self.workspace()?.id))
    }

    pub fn user(&self) -> Result<&User> {
        self.user.as_ref().ok_or_else(|| out_of_order("the user"))
    }

    pub fn workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().ok_or_else(|| out_of_order("the workspace"))
    }

    pub fn admin_role(&self) -> Result<&Role> {
        self.admin_role.as_ref().ok_or_else(|| out_of_order("the Admin role"))
    }

    pub fn member_role(&self) -> Result<&Role> {
        self.member_role.as_ref().ok_or_else(|| out_of_order("the Member role"))
    }

    pub fn user_workspace(&self) -> Result<&UserWorkspace> {
        self.user_workspace
            .as_ref()
            .ok_or_else(|| out_of_order("the founder membership"))
    }

    pub fn api_key(&self) -> Result<&ApiKey> {
        self.api_key.as_ref().ok_or_else(|| out_of_order("the API key"))
    }

    pub fn api_token(&self) -> Result<&ApiToken> {
        self.api_token.as_ref().ok_or_else(|| out_of_order("the API token"))
    }

    pub fn workspace_urls(&self) -> Result<&WorkspaceUrls> {
        self.workspace_urls
            .as_ref()
            .ok_or_else(|| out_of_order("the workspace URLs"))
    }

    /// Expiry of a credential issued now with the given lifetime.
    pub fn expires_at(&self, lifetime: Duration) -> Result<DateTime<Utc>> {
        chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                KennelError::general_error(format!("Token lifetime {lifetime:?} is out of range"))
                    .into_anyhow()
            })
    }
}
