//! Workspace bootstrap.
//!
//! Turns a sign-up request into a ready-to-use workspace: user and workspace
//! created and activated, default roles configured, the support account
//! attached as Admin, onboarding skipped and a long-lived Admin API token
//! issued. Runs as a [`Saga`] so that a failure unwinds what was already
//! done.

mod context;
mod options;
pub mod steps;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

pub use context::BootstrapContext;
pub use options::{
    BootstrapOptions, DEFAULT_ADMIN_ROLE, DEFAULT_API_KEY_NAME, DEFAULT_MEMBER_ROLE,
    DEFAULT_SUPPORT_EMAIL, DEFAULT_TOKEN_LIFETIME,
};

use crate::models::{NewUser, WorkspaceUrls};
use crate::saga::{Saga, SagaReport};
use crate::services::Collaborators;
use crate::urls::WorkspaceUrlBuilder;
use crate::validation;
use steps::{
    ActivateWorkspace, ApplyWorkspaceDefaults, AssignMemberRole, AttachSupportAdmin,
    CompleteOnboarding, IssueApiCredential, ResolveDefaultRoles, ResolveMembership,
    ResolveWorkspaceUrls, RestrictMemberRole, SignUp,
};

pub const SAGA_NAME: &str = "create-user-and-workspace";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserAndWorkspace {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[validate(url(message = "must be a valid URL"))]
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub workspace_name: String,
}

impl CreateUserAndWorkspace {
    /// Surrounding whitespace stripped from the email and workspace name, so
    /// a blank name fails the length check.
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.workspace_name = self.workspace_name.trim().to_string();
        self
    }

    pub fn new_user(&self) -> NewUser {
        NewUser {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            picture: self.picture.clone(),
            locale: self.locale.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapOutcome {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub workspace_urls: WorkspaceUrls,
    pub api_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub issued_at: DateTime<Utc>,
    #[serde(skip)]
    pub report: SagaReport,
}

pub struct WorkspaceBootstrap {
    saga: Saga<BootstrapContext>,
    options: BootstrapOptions,
}

impl WorkspaceBootstrap {
    pub fn new(
        services: Collaborators,
        urls: WorkspaceUrlBuilder,
        options: BootstrapOptions,
    ) -> Result<Self> {
        options.validate().map_err(|e| anyhow!(e))?;

        let saga = Saga::<BootstrapContext>::new(SAGA_NAME)
            .step(SignUp {
                accounts: services.accounts.clone(),
            })
            .step(ActivateWorkspace {
                workspaces: services.workspaces.clone(),
            })
            .step(ResolveDefaultRoles {
                roles: services.roles.clone(),
                admin_label: options.admin_role_label.clone(),
                member_label: options.member_role_label.clone(),
            })
            .step(RestrictMemberRole {
                roles: services.roles.clone(),
                permissions: options.member_permissions,
            })
            .step(ResolveMembership {
                memberships: services.memberships.clone(),
            })
            .step(ApplyWorkspaceDefaults {
                workspaces: services.workspaces.clone(),
            })
            .step(AttachSupportAdmin {
                accounts: services.accounts.clone(),
                memberships: services.memberships.clone(),
                support_email: options.support_email.clone(),
            })
            .step(AssignMemberRole {
                user_roles: services.user_roles.clone(),
            })
            .step(CompleteOnboarding {
                onboarding: services.onboarding.clone(),
            })
            .step(IssueApiCredential {
                api_keys: services.api_keys.clone(),
                key_name: options.api_key_name.clone(),
                lifetime: options.token_lifetime,
            })
            .step(ResolveWorkspaceUrls { urls })
            .with_retry(options.retry.clone())
            .compensate_on_failure(options.compensate_on_failure);

        Ok(Self { saga, options })
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.saga.step_names()
    }

    /// Create a user, its workspace and an Admin API token in one go.
    ///
    /// On failure the error of the failing step is returned as is, after the
    /// completed steps were compensated (unless compensation is disabled).
    #[instrument(name = "bootstrap", skip_all, fields(workspace_name = %input.workspace_name))]
    pub async fn create_user_and_workspace(
        &self,
        input: CreateUserAndWorkspace,
    ) -> Result<BootstrapOutcome> {
        let input = input.normalized();
        validation::validate(&input, "Invalid sign up")?;

        let mut ctx = BootstrapContext::new(input, Utc::now());
        match self.saga.run(&mut ctx).await {
            Ok(report) => {
                let outcome = BootstrapOutcome {
                    user_id: ctx.user()?.id,
                    workspace_id: ctx.workspace()?.id,
                    workspace_urls: ctx.workspace_urls()?.clone(),
                    api_token: ctx.api_token()?.token.clone(),
                    expires_at: ctx.api_key()?.expires_at,
                    issued_at: ctx.issued_at,
                    report,
                };
                info!(
                    user_id = %outcome.user_id,
                    workspace_id = %outcome.workspace_id,
                    "user and workspace created"
                );
                Ok(outcome)
            }
            Err(failure) => {
                error!(
                    step = failure.step,
                    state = ?failure.report.state,
                    compensated = ?failure.report.compensated,
                    error = %failure.error,
                    "Error creating user and workspace"
                );
                Err(failure.into_error())
            }
        }
    }
}
