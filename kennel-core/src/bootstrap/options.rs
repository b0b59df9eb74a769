// Bootstrap options and configuration.

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::config::KennelConfigSnapshot;
use crate::models::RolePermissions;
use crate::saga::RetryPolicy;

/// Five years of 365 days.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 365 * 24 * 60 * 60);
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@kennel.dev";
pub const DEFAULT_API_KEY_NAME: &str = "Webapp";
pub const DEFAULT_ADMIN_ROLE: &str = "Admin";
pub const DEFAULT_MEMBER_ROLE: &str = "Member";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapOptions {
    /// Account added as Admin to every new workspace.
    pub support_email: String,
    /// Validity of the API key issued at the end of the bootstrap.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,
    pub api_key_name: String,
    pub admin_role_label: String,
    pub member_role_label: String,
    /// Flags forced onto the Member role.
    pub member_permissions: RolePermissions,
    /// Undo completed steps when a later one fails.
    pub compensate_on_failure: bool,
    pub retry: RetryPolicy,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            api_key_name: DEFAULT_API_KEY_NAME.to_string(),
            admin_role_label: DEFAULT_ADMIN_ROLE.to_string(),
            member_role_label: DEFAULT_MEMBER_ROLE.to_string(),
            member_permissions: RolePermissions::restricted_member(),
            compensate_on_failure: true,
            retry: RetryPolicy::once(),
        }
    }
}

impl BootstrapOptions {
    pub fn validate(&self) -> Result<(), String> {
        let email = self.support_email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(format!("Support email `{}` is not a valid email", self.support_email)),
        }

        if self.token_lifetime.is_zero() {
            return Err("Token lifetime must be greater than 0".to_string());
        }

        if self.api_key_name.trim().is_empty() {
            return Err("API key name cannot be empty".to_string());
        }

        if self.admin_role_label.trim().is_empty() || self.member_role_label.trim().is_empty() {
            return Err("Role labels cannot be empty".to_string());
        }

        if self.admin_role_label == self.member_role_label {
            return Err("Admin and Member role labels must differ".to_string());
        }

        if self.retry.max_attempts == 0 {
            return Err("Retry policy must allow at least one attempt".to_string());
        }

        Ok(())
    }

    /// Defaults overlaid with the `bootstrap.*` keys of `config`.
    pub fn from_config(config: &KennelConfigSnapshot) -> Result<Self> {
        let mut options = Self::default();

        if let Some(email) = config.get_string("bootstrap.support_email") {
            options.support_email = email;
        }
        if let Some(raw) = config.get("bootstrap.token_lifetime") {
            options.token_lifetime = config
                .get_duration("bootstrap.token_lifetime")
                .ok_or_else(|| anyhow!("Invalid bootstrap.token_lifetime `{raw}`"))?;
        }
        if let Some(name) = config.get_string("bootstrap.api_key_name") {
            options.api_key_name = name;
        }
        if let Some(label) = config.get_string("bootstrap.admin_role") {
            options.admin_role_label = label;
        }
        if let Some(label) = config.get_string("bootstrap.member_role") {
            options.member_role_label = label;
        }
        if let Some(raw) = config.get("bootstrap.compensate") {
            options.compensate_on_failure = config
                .get_bool("bootstrap.compensate")
                .ok_or_else(|| anyhow!("Invalid bootstrap.compensate `{raw}`"))?;
        }
        if let Some(raw) = config.get("bootstrap.retry.max_attempts") {
            let attempts = config
                .get_u32("bootstrap.retry.max_attempts")
                .ok_or_else(|| anyhow!("Invalid bootstrap.retry.max_attempts `{raw}`"))?;
            options.retry.max_attempts = attempts;
        }

        options.validate().map_err(|e| anyhow!(e))?;
        Ok(options)
    }

    pub fn with_support_email(mut self, email: impl Into<String>) -> Self {
        self.support_email = email.into();
        self
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    pub fn with_compensation(mut self, enabled: bool) -> Self {
        self.compensate_on_failure = enabled;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KennelConfig;

    #[test]
    fn defaults_match_the_documented_policy() {
        let options = BootstrapOptions::default();
        assert_eq!(options.token_lifetime.as_secs(), 5 * 365 * 86_400);
        assert_eq!(options.api_key_name, "Webapp");
        assert_eq!(options.member_permissions, RolePermissions::restricted_member());
        assert!(options.compensate_on_failure);
        assert_eq!(options.retry.max_attempts, 1);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn config_overrides_defaults() {
        let snap = KennelConfig::new()
            .with("bootstrap.support_email", "ops@acme.dev")
            .with("bootstrap.token_lifetime", "30days")
            .with("bootstrap.compensate", "false")
            .with("bootstrap.retry.max_attempts", "4")
            .snapshot();

        let options = BootstrapOptions::from_config(&snap).unwrap();
        assert_eq!(options.support_email, "ops@acme.dev");
        assert_eq!(options.token_lifetime, Duration::from_secs(30 * 86_400));
        assert!(!options.compensate_on_failure);
        assert_eq!(options.retry.max_attempts, 4);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let snap = KennelConfig::new()
            .with("bootstrap.token_lifetime", "forever")
            .snapshot();
        assert!(BootstrapOptions::from_config(&snap).is_err());

        let snap = KennelConfig::new()
            .with("bootstrap.support_email", "nobody")
            .snapshot();
        assert!(BootstrapOptions::from_config(&snap).is_err());
    }

    #[test]
    fn validation_catches_bad_combinations() {
        let same_labels = BootstrapOptions {
            member_role_label: "Admin".to_string(),
            ..BootstrapOptions::default()
        };
        assert!(same_labels.validate().is_err());

        let no_lifetime = BootstrapOptions::default().with_token_lifetime(Duration::ZERO);
        assert!(no_lifetime.validate().is_err());
    }

    #[test]
    fn humantime_round_trip_in_json() {
        let json = serde_json::to_value(BootstrapOptions::default()).unwrap();
        assert_eq!(json["tokenLifetime"], "1825days");
    }
}
