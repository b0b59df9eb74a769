// Pre-shared API key check.

use std::collections::HashSet;

use anyhow::Result;
use kennel_core::KennelError;
use tracing::debug;

use crate::options::ApiKeyOptions;

#[derive(Clone)]
pub struct ApiKeyGuard {
    header_name: String,
    keys: HashSet<String>,
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard")
            .field("header_name", &self.header_name)
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl ApiKeyGuard {
    pub fn new(options: &ApiKeyOptions) -> Self {
        Self {
            header_name: options.header_name.clone(),
            keys: options.keys.iter().map(|k| k.trim().to_string()).collect(),
        }
    }

    /// Header the key is read from.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Accept `presented` when it is one of the configured keys.
    pub fn check(&self, presented: Option<&str>) -> Result<()> {
        let presented = presented.map(str::trim).filter(|k| !k.is_empty());
        let Some(presented) = presented else {
            debug!(header = %self.header_name, "request without API key");
            return Err(KennelError::not_authenticated("Missing API key").into_anyhow());
        };

        if self.keys.contains(presented) {
            Ok(())
        } else {
            debug!(header = %self.header_name, "request with unknown API key");
            Err(KennelError::forbidden("Invalid API key").into_anyhow())
        }
    }
}
