// Authentication options and configuration.

use std::time::Duration;

use anyhow::{anyhow, Result};
use kennel_core::KennelConfigSnapshot;
use serde::{Deserialize, Serialize};

/// JWT signing algorithms
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl JwtAlgorithm {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }
}

/// Main authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthOptions {
    /// JWT settings for issued API tokens
    pub jwt: JwtOptions,
    /// Pre-shared keys accepted on protected routes
    pub api_key: ApiKeyOptions,
}

impl AuthOptions {
    /// Validate the entire authentication configuration
    pub fn validate(&self) -> Result<(), String> {
        self.jwt
            .validate()
            .map_err(|e| format!("JWT validation failed: {e}"))?;
        self.api_key
            .validate()
            .map_err(|e| format!("API key validation failed: {e}"))?;
        Ok(())
    }

    pub fn builder() -> AuthOptionsBuilder {
        AuthOptionsBuilder::new()
    }

    /// Read `auth.*` keys on top of the defaults and validate the result.
    pub fn from_config(config: &KennelConfigSnapshot) -> Result<Self> {
        let mut jwt = JwtOptions::default();
        if let Some(raw) = config.get("auth.jwt.algorithm") {
            jwt.algorithm = JwtAlgorithm::parse(raw)
                .ok_or_else(|| anyhow!("Unsupported auth.jwt.algorithm `{raw}`"))?;
        }
        if let Some(secret) = config.get_string("auth.jwt.secret") {
            jwt.secret = Some(secret);
        }
        if let Some(issuer) = config.get_string("auth.jwt.issuer") {
            jwt.issuer = issuer;
        }
        let audience = config.get_list("auth.jwt.audience");
        if !audience.is_empty() {
            jwt.audience = audience;
        }

        let mut api_key = ApiKeyOptions::default();
        if let Some(header) = config.get_string("auth.api_key.header") {
            api_key.header_name = header;
        }
        api_key.keys = config.get_list("auth.api_keys");

        Self::builder()
            .jwt(jwt)
            .api_key(api_key)
            .build_validated()
            .map_err(|e| anyhow!(e))
    }
}

/// JWT-specific configuration options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Token audience (aud claim); the first entry is written into tokens
    pub audience: Vec<String>,
    /// HMAC signing secret
    pub secret: Option<String>,
    /// Clock skew tolerated when checking `exp`
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "kennel".to_string(),
            audience: vec!["kennel-api".to_string()],
            secret: None,
            leeway: Duration::from_secs(60),
        }
    }
}

impl JwtOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }

        if self.audience.is_empty() || self.audience.iter().any(|a| a.is_empty()) {
            return Err("JWT audience cannot be empty".to_string());
        }

        match &self.secret {
            None => return Err("HMAC algorithms require a secret".to_string()),
            Some(secret) if secret.len() < 32 => {
                return Err("JWT secret must be at least 32 bytes".to_string());
            }
            Some(_) => {}
        }

        Ok(())
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// API key authentication options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyOptions {
    /// Header name for API key (e.g., "X-API-Key")
    pub header_name: String,
    /// Accepted keys
    pub keys: Vec<String>,
}

impl Default for ApiKeyOptions {
    fn default() -> Self {
        Self {
            header_name: "X-API-Key".to_string(),
            keys: Vec::new(),
        }
    }
}

impl ApiKeyOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.header_name.is_empty() {
            return Err("API key header name cannot be empty".to_string());
        }

        if !self
            .header_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(
                "API key header name must contain only alphanumeric characters, hyphens, and underscores"
                    .to_string(),
            );
        }

        if self.keys.is_empty() {
            return Err("At least one API key must be configured".to_string());
        }

        if self.keys.iter().any(|k| k.trim().is_empty()) {
            return Err("API keys cannot be blank".to_string());
        }

        Ok(())
    }
}

/// Builder pattern for AuthOptions configuration
#[derive(Clone, Debug, Default)]
pub struct AuthOptionsBuilder {
    jwt: Option<JwtOptions>,
    api_key: Option<ApiKeyOptions>,
}

impl AuthOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jwt(mut self, jwt_options: JwtOptions) -> Self {
        self.jwt = Some(jwt_options);
        self
    }

    pub fn api_key(mut self, api_key_options: ApiKeyOptions) -> Self {
        self.api_key = Some(api_key_options);
        self
    }

    /// Add one accepted key, keeping the configured header.
    pub fn accept_key(mut self, key: impl Into<String>) -> Self {
        let mut api_key = self.api_key.take().unwrap_or_default();
        api_key.keys.push(key.into());
        self.api_key = Some(api_key);
        self
    }

    pub fn build(self) -> AuthOptions {
        AuthOptions {
            jwt: self.jwt.unwrap_or_default(),
            api_key: self.api_key.unwrap_or_default(),
        }
    }

    pub fn build_validated(self) -> Result<AuthOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_core::KennelConfig;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn builder_produces_valid_options() {
        let options = AuthOptions::builder()
            .jwt(JwtOptions::default().with_secret(SECRET))
            .accept_key("k1")
            .accept_key("k2")
            .build_validated()
            .unwrap();

        assert_eq!(options.api_key.header_name, "X-API-Key");
        assert_eq!(options.api_key.keys, vec!["k1", "k2"]);
        assert_eq!(options.jwt.algorithm, JwtAlgorithm::HS256);
    }

    #[test]
    fn missing_secret_or_keys_fail_validation() {
        let no_secret = AuthOptions::builder().accept_key("k1").build_validated();
        assert!(no_secret.unwrap_err().contains("secret"));

        let no_keys = AuthOptions::builder()
            .jwt(JwtOptions::default().with_secret(SECRET))
            .build_validated();
        assert!(no_keys.unwrap_err().contains("API key"));

        let short = AuthOptions::builder()
            .jwt(JwtOptions::default().with_secret("short"))
            .accept_key("k1")
            .build_validated();
        assert!(short.is_err());
    }

    #[test]
    fn header_name_is_checked() {
        let options = ApiKeyOptions {
            header_name: "x api key".to_string(),
            keys: vec!["k".to_string()],
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn reads_auth_keys_from_config() {
        let snap = KennelConfig::new()
            .with("auth.jwt.secret", SECRET)
            .with("auth.jwt.issuer", "acme")
            .with("auth.jwt.audience", "acme-api, acme-admin")
            .with("auth.jwt.algorithm", "hs512")
            .with("auth.api_keys", "alpha, beta")
            .snapshot();

        let options = AuthOptions::from_config(&snap).unwrap();
        assert_eq!(options.jwt.issuer, "acme");
        assert_eq!(options.jwt.audience, vec!["acme-api", "acme-admin"]);
        assert_eq!(options.jwt.algorithm, JwtAlgorithm::HS512);
        assert_eq!(options.api_key.keys, vec!["alpha", "beta"]);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let snap = KennelConfig::new()
            .with("auth.jwt.secret", SECRET)
            .with("auth.jwt.algorithm", "RS256")
            .with("auth.api_keys", "alpha")
            .snapshot();
        assert!(AuthOptions::from_config(&snap).is_err());
    }
}
