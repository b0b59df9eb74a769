//! Public URLs of a workspace.

use anyhow::Result;
use url::Url;

use crate::errors::KennelError;
use crate::models::{Workspace, WorkspaceUrls};

#[derive(Debug, Clone)]
pub struct WorkspaceUrlBuilder {
    base: Url,
}

impl WorkspaceUrlBuilder {
    /// `base_url` is the front URL without any workspace subdomain, e.g.
    /// `https://kennel.dev`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            KennelError::general_error(format!("Invalid base URL `{base_url}`: {e}")).into_anyhow()
        })?;
        if base.host_str().is_none() {
            return Err(
                KennelError::general_error(format!("Base URL `{base_url}` has no host"))
                    .into_anyhow(),
            );
        }
        Ok(Self { base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn subdomain_url(&self, subdomain: &str) -> Result<String> {
        let host = self.base.host_str().unwrap_or_default();
        let mut url = self.base.clone();
        url.set_host(Some(&format!("{subdomain}.{host}"))).map_err(|e| {
            KennelError::general_error(format!("Invalid workspace subdomain `{subdomain}`: {e}"))
                .into_anyhow()
        })?;
        Ok(url.to_string())
    }

    pub fn custom_url(&self, custom_domain: &str) -> Result<String> {
        let url = Url::parse(&format!("{}://{custom_domain}", self.base.scheme())).map_err(|e| {
            KennelError::general_error(format!("Invalid custom domain `{custom_domain}`: {e}"))
                .into_anyhow()
        })?;
        Ok(url.to_string())
    }

    pub fn workspace_urls(&self, workspace: &Workspace) -> Result<WorkspaceUrls> {
        let custom_url = workspace
            .custom_domain
            .as_deref()
            .map(|domain| self.custom_url(domain))
            .transpose()?;

        Ok(WorkspaceUrls {
            custom_url,
            subdomain_url: self.subdomain_url(&workspace.subdomain)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::ActivationStatus;

    fn workspace(custom_domain: Option<&str>) -> Workspace {
        Workspace {
            id: Uuid::new_v4(),
            display_name: Some("Acme".to_string()),
            subdomain: "acme".to_string(),
            custom_domain: custom_domain.map(str::to_string),
            default_role_id: None,
            activation_status: ActivationStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn subdomain_is_prefixed_to_host() {
        let urls = WorkspaceUrlBuilder::new("https://kennel.dev")
            .unwrap()
            .workspace_urls(&workspace(None))
            .unwrap();
        assert_eq!(urls.subdomain_url, "https://acme.kennel.dev/");
        assert_eq!(urls.custom_url, None);
    }

    #[test]
    fn port_and_scheme_are_kept() {
        let builder = WorkspaceUrlBuilder::new("http://localhost:3001").unwrap();
        assert_eq!(builder.subdomain_url("acme").unwrap(), "http://acme.localhost:3001/");
    }

    #[test]
    fn custom_domain_adds_custom_url() {
        let urls = WorkspaceUrlBuilder::new("https://kennel.dev")
            .unwrap()
            .workspace_urls(&workspace(Some("crm.acme.com")))
            .unwrap();
        assert_eq!(urls.custom_url.as_deref(), Some("https://crm.acme.com/"));
    }

    #[test]
    fn rejects_base_without_host() {
        assert!(WorkspaceUrlBuilder::new("not a url").is_err());
        assert!(WorkspaceUrlBuilder::new("mailto:ops@kennel.dev").is_err());
    }
}
