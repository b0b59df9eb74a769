use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use kennel_core::errors::{ErrorKind, KennelError};
use kennel_core::models::{
    ActivationStatus, ApiKey, NewUser, OnboardingState, Role, RoleAssignment, RolePermissions,
    User, UserWorkspace, Workspace,
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Operation names understood by [`FaultPlan`].
pub mod ops {
    pub const SIGN_UP: &str = "accounts.sign_up";
    pub const USER_BY_EMAIL: &str = "accounts.user_by_email";
    pub const REMOVE_SIGN_UP: &str = "accounts.remove_sign_up";
    pub const GET_WORKSPACE: &str = "workspaces.get";
    pub const ACTIVATE_WORKSPACE: &str = "workspaces.activate";
    pub const DEACTIVATE_WORKSPACE: &str = "workspaces.deactivate";
    pub const UPDATE_WORKSPACE: &str = "workspaces.update";
    pub const WORKSPACE_ROLES: &str = "roles.workspace_roles";
    pub const UPDATE_ROLE: &str = "roles.update_role";
    pub const USER_WORKSPACE: &str = "memberships.user_workspace";
    pub const ADD_MEMBER: &str = "memberships.add_user";
    pub const REMOVE_MEMBER: &str = "memberships.remove";
    pub const ROLE_OF: &str = "user_roles.role_of";
    pub const ASSIGN_ROLE: &str = "user_roles.assign";
    pub const UNASSIGN_ROLE: &str = "user_roles.unassign";
    pub const ONBOARDING_STATE: &str = "onboarding.state";
    pub const SET_INVITE_TEAM: &str = "onboarding.set_invite_team";
    pub const SET_BOOK_ONBOARDING: &str = "onboarding.set_book_onboarding";
    pub const CREATE_API_KEY: &str = "api_keys.create";
    pub const GENERATE_TOKEN: &str = "api_keys.generate_token";
    pub const REVOKE_API_KEY: &str = "api_keys.revoke";
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    remaining: u32,
    kind: ErrorKind,
}

/// Scripted failures: make a named operation fail a number of times before
/// it goes back to normal. Every call is counted, failing or not.
#[derive(Debug, Default)]
pub struct FaultPlan {
    faults: Mutex<HashMap<String, Fault>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FaultPlan {
    pub async fn fail(&self, op: &str, times: u32, kind: ErrorKind) {
        self.faults
            .lock()
            .await
            .insert(op.to_string(), Fault { remaining: times, kind });
    }

    pub async fn fail_always(&self, op: &str, kind: ErrorKind) {
        self.fail(op, u32::MAX, kind).await;
    }

    pub async fn clear(&self) {
        self.faults.lock().await.clear();
    }

    pub async fn calls(&self, op: &str) -> u32 {
        self.calls.lock().await.get(op).copied().unwrap_or(0)
    }

    /// Record a call to `op` and raise the scripted error if one is due.
    pub async fn check(&self, op: &str) -> Result<()> {
        *self.calls.lock().await.entry(op.to_string()).or_insert(0) += 1;

        let mut faults = self.faults.lock().await;
        let Some(fault) = faults.get_mut(op) else {
            return Ok(());
        };
        if fault.remaining == 0 {
            return Ok(());
        }
        fault.remaining -= 1;
        Err(KennelError::new(fault.kind, format!("Injected failure in {op}")).into_anyhow())
    }
}

/// Labels of the roles seeded into every new workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRoles {
    pub admin: String,
    pub member: String,
    pub guest: String,
}

impl Default for SeededRoles {
    fn default() -> Self {
        Self {
            admin: "Admin".to_string(),
            member: "Member".to_string(),
            guest: "Guest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: HashMap<Uuid, User>,
    pub workspaces: HashMap<Uuid, Workspace>,
    pub roles: HashMap<Uuid, Role>,
    pub memberships: HashMap<Uuid, UserWorkspace>,
    /// Keyed by membership id.
    pub role_assignments: HashMap<Uuid, RoleAssignment>,
    /// Keyed by workspace id.
    pub onboarding: HashMap<Uuid, OnboardingState>,
    pub api_keys: HashMap<Uuid, ApiKey>,
}

impl MemoryState {
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
    }

    pub fn workspace(&self, workspace_id: Uuid) -> Result<&Workspace> {
        self.workspaces.get(&workspace_id).ok_or_else(|| {
            KennelError::not_found(format!("Workspace {workspace_id} not found")).into_anyhow()
        })
    }

    pub fn workspace_mut(&mut self, workspace_id: Uuid) -> Result<&mut Workspace> {
        self.workspaces.get_mut(&workspace_id).ok_or_else(|| {
            KennelError::not_found(format!("Workspace {workspace_id} not found")).into_anyhow()
        })
    }

    pub fn role_in(&self, workspace_id: Uuid, role_id: Uuid) -> Result<&Role> {
        self.roles
            .get(&role_id)
            .filter(|r| r.workspace_id == workspace_id)
            .ok_or_else(|| {
                KennelError::not_found(format!("Role {role_id} not found")).into_anyhow()
            })
    }

    pub fn membership_in(
        &self,
        workspace_id: Uuid,
        user_workspace_id: Uuid,
    ) -> Result<&UserWorkspace> {
        self.memberships
            .get(&user_workspace_id)
            .filter(|m| m.workspace_id == workspace_id)
            .ok_or_else(|| {
                KennelError::not_found(format!("Membership {user_workspace_id} not found"))
                    .into_anyhow()
            })
    }

    pub fn membership_of(&self, workspace_id: Uuid, user_id: Uuid) -> Option<&UserWorkspace> {
        self.memberships
            .values()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
    }

    pub fn roles_of_workspace(&self, workspace_id: Uuid) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .roles
            .values()
            .filter(|r| r.workspace_id == workspace_id)
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.label.cmp(&b.label));
        roles
    }

    pub fn role_by_label(&self, workspace_id: Uuid, label: &str) -> Option<&Role> {
        self.roles
            .values()
            .find(|r| r.workspace_id == workspace_id && r.label == label)
    }

    /// Role id currently assigned to `user_id` in `workspace_id`.
    pub fn role_of_user(&self, workspace_id: Uuid, user_id: Uuid) -> Option<Uuid> {
        let membership = self.membership_of(workspace_id, user_id)?;
        self.role_assignments.get(&membership.id).map(|a| a.role_id)
    }

    pub fn insert_user(&mut self, user: NewUser) -> Result<User> {
        if self.user_by_email(&user.email).is_some() {
            return Err(
                KennelError::conflict(format!("User with email {} already exists", user.email))
                    .into_anyhow(),
            );
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email.trim().to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
            picture: user.picture,
            locale: user.locale,
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn insert_membership(
        &mut self,
        workspace_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> UserWorkspace {
        let membership = UserWorkspace {
            id: Uuid::new_v4(),
            user_id,
            workspace_id,
            created_at: Utc::now(),
        };
        self.memberships.insert(membership.id, membership.clone());
        self.role_assignments.insert(
            membership.id,
            RoleAssignment {
                user_workspace_id: membership.id,
                role_id,
                workspace_id,
            },
        );
        membership
    }

    pub fn seed_roles(&mut self, workspace_id: Uuid, labels: &SeededRoles) -> Uuid {
        let seeds = [
            (&labels.admin, RolePermissions::all(), false),
            (&labels.member, RolePermissions::all(), true),
            (&labels.guest, RolePermissions::none(), true),
        ];
        let mut admin_id = Uuid::nil();
        for (index, (label, permissions, is_editable)) in seeds.into_iter().enumerate() {
            let role = Role {
                id: Uuid::new_v4(),
                workspace_id,
                label: label.clone(),
                permissions,
                is_editable,
            };
            if index == 0 {
                admin_id = role.id;
            }
            self.roles.insert(role.id, role);
        }
        admin_id
    }

    /// Drop the workspace and everything scoped to it.
    pub fn purge_workspace(&mut self, workspace_id: Uuid) {
        self.workspaces.remove(&workspace_id);
        self.roles.retain(|_, r| r.workspace_id != workspace_id);
        self.memberships.retain(|_, m| m.workspace_id != workspace_id);
        self.role_assignments.retain(|_, a| a.workspace_id != workspace_id);
        self.onboarding.remove(&workspace_id);
        self.api_keys.retain(|_, k| k.workspace_id != workspace_id);
    }
}

/// Shared in-memory storage behind every collaborator of this crate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub state: RwLock<MemoryState>,
    pub faults: FaultPlan,
    seeded_roles: SeededRoles,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed new workspaces with these role labels instead of the defaults.
    pub fn with_seeded_roles(mut self, roles: SeededRoles) -> Self {
        self.seeded_roles = roles;
        self
    }

    pub fn seeded_roles(&self) -> &SeededRoles {
        &self.seeded_roles
    }

    /// Create an account outside of any workspace, e.g. the support admin.
    pub async fn seed_user(&self, user: NewUser) -> Result<User> {
        self.state.write().await.insert_user(user)
    }

    /// Copy of the whole store, for inspection.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.read().await.clone()
    }

    pub(crate) fn new_workspace(&self) -> Workspace {
        let id = Uuid::new_v4();
        let simple = id.simple().to_string();
        Workspace {
            id,
            display_name: None,
            subdomain: format!("ws-{}", &simple[..8]),
            custom_domain: None,
            default_role_id: None,
            activation_status: ActivationStatus::PendingCreation,
            created_at: Utc::now(),
        }
    }
}
