//! Records the bootstrap flow reads and writes.
//!
//! These are owned and persisted by the collaborators; the orchestrator only
//! passes them from one step to the next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
    pub locale: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile of the user that signs up on a new workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationStatus {
    PendingCreation,
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub default_role_id: Option<Uuid>,
    pub activation_status: ActivationStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields of a workspace that can be changed after activation.
/// An outer `None` leaves the current value untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role_id: Option<Option<Uuid>>,
}

impl WorkspacePatch {
    /// Patch that puts back the editable fields of `workspace`.
    pub fn restore(workspace: &Workspace) -> Self {
        Self {
            display_name: Some(workspace.display_name.clone()),
            default_role_id: Some(workspace.default_role_id),
        }
    }

    pub fn apply(&self, workspace: &mut Workspace) {
        if let Some(display_name) = &self.display_name {
            workspace.display_name = display_name.clone();
        }
        if let Some(default_role_id) = self.default_role_id {
            workspace.default_role_id = default_role_id;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    pub can_destroy_all_object_records: bool,
    pub can_update_all_settings: bool,
    pub can_access_all_tools: bool,
}

impl RolePermissions {
    pub const fn all() -> Self {
        Self {
            can_destroy_all_object_records: true,
            can_update_all_settings: true,
            can_access_all_tools: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            can_destroy_all_object_records: false,
            can_update_all_settings: false,
            can_access_all_tools: false,
        }
    }

    /// Policy applied to the Member role of every new workspace: no bulk
    /// destruction, no global settings, tools allowed.
    pub const fn restricted_member() -> Self {
        Self {
            can_destroy_all_object_records: false,
            can_update_all_settings: false,
            can_access_all_tools: true,
        }
    }
}

impl Default for RolePermissions {
    fn default() -> Self {
        Self::restricted_member()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub label: String,
    #[serde(flatten)]
    pub permissions: RolePermissions,
    pub is_editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkspace {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of an idempotent "add if not already a member" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub user_workspace: UserWorkspace,
    /// `false` when the membership already existed.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub user_workspace_id: Uuid,
    pub role_id: Uuid,
    pub workspace_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub workspace_id: Uuid,
    pub invite_team_pending: bool,
    pub book_onboarding_pending: bool,
}

impl OnboardingState {
    pub fn fresh(workspace_id: Uuid) -> Self {
        Self {
            workspace_id,
            invite_team_pending: true,
            book_onboarding_pending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: Uuid,
    pub name: String,
    pub workspace_id: Uuid,
    pub role_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiKey {
    pub name: String,
    pub role_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpResult {
    pub user: User,
    pub workspace: Workspace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    pub subdomain_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_flags_flatten_into_camel_case() {
        let role = Role {
            id: Uuid::nil(),
            workspace_id: Uuid::nil(),
            label: "Member".to_string(),
            permissions: RolePermissions::restricted_member(),
            is_editable: true,
        };
        let value = serde_json::to_value(&role).unwrap();
        assert_eq!(value["canDestroyAllObjectRecords"], json!(false));
        assert_eq!(value["canUpdateAllSettings"], json!(false));
        assert_eq!(value["canAccessAllTools"], json!(true));
        assert_eq!(value["label"], "Member");
    }

    #[test]
    fn patch_restores_cleared_fields() {
        let mut workspace = Workspace {
            id: Uuid::new_v4(),
            display_name: None,
            subdomain: "acme".to_string(),
            custom_domain: None,
            default_role_id: None,
            activation_status: ActivationStatus::Active,
            created_at: Utc::now(),
        };
        let before = workspace.clone();

        WorkspacePatch {
            display_name: Some(Some("Acme".to_string())),
            default_role_id: Some(Some(Uuid::new_v4())),
        }
        .apply(&mut workspace);
        assert_eq!(workspace.display_name.as_deref(), Some("Acme"));

        WorkspacePatch::restore(&before).apply(&mut workspace);
        assert_eq!(workspace, before);

        WorkspacePatch::default().apply(&mut workspace);
        assert_eq!(workspace, before);
    }

    #[test]
    fn revoked_or_expired_keys_are_inactive() {
        let now = Utc::now();
        let mut key = ApiKey {
            id: Uuid::new_v4(),
            name: "Webapp".to_string(),
            workspace_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            expires_at: now + chrono::Duration::days(1),
            revoked_at: None,
            created_at: now,
        };
        assert!(key.is_active_at(now));
        assert!(!key.is_active_at(now + chrono::Duration::days(2)));
        key.revoked_at = Some(now);
        assert!(!key.is_active_at(now));
    }
}
