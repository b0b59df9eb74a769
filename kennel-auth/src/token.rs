// API token issuance.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use kennel_core::KennelError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::options::{JwtAlgorithm, JwtOptions};

pub const API_KEY_TOKEN_TYPE: &str = "API_KEY";

/// Claims carried by a workspace API token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiTokenClaims {
    /// Workspace id
    pub sub: String,
    #[serde(rename = "workspaceId")]
    pub workspace_id: Uuid,
    /// API key id
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ApiTokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signs and verifies compact JWTs.
pub trait JwtProvider: Send + Sync {
    fn sign(&self, jwt: &JwtOptions, claims: &ApiTokenClaims) -> Result<String>;

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<ApiTokenClaims>;
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
struct DisabledJwtProvider;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtProvider for DisabledJwtProvider {
    fn sign(&self, _jwt: &JwtOptions, _claims: &ApiTokenClaims) -> Result<String> {
        Err(anyhow!(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)"
        ))
    }

    fn verify(&self, _jwt: &JwtOptions, _token: &str) -> Result<ApiTokenClaims> {
        Err(anyhow!(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)"
        ))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
struct JsonwebtokenProvider;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JsonwebtokenProvider {
    fn algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    fn secret(jwt: &JwtOptions) -> Result<&[u8]> {
        jwt.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or_else(|| KennelError::general_error("JWT secret is not configured").into_anyhow())
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtProvider for JsonwebtokenProvider {
    fn sign(&self, jwt: &JwtOptions, claims: &ApiTokenClaims) -> Result<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let header = Header::new(Self::algorithm(jwt.algorithm));
        encode(&header, claims, &EncodingKey::from_secret(Self::secret(jwt)?)).map_err(|e| {
            KennelError::general_error(format!("Could not sign API token: {e}")).into_anyhow()
        })
    }

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<ApiTokenClaims> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let mut validation = Validation::new(Self::algorithm(jwt.algorithm));
        validation.leeway = jwt.leeway.as_secs();
        validation.set_issuer(&[jwt.issuer.as_str()]);
        let audience: Vec<&str> = jwt.audience.iter().map(String::as_str).collect();
        validation.set_audience(&audience);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let decoded = decode::<ApiTokenClaims>(
            token,
            &DecodingKey::from_secret(Self::secret(jwt)?),
            &validation,
        )
        .map_err(|e| KennelError::not_authenticated(e.to_string()).into_anyhow())?;

        Ok(decoded.claims)
    }
}

fn default_provider() -> Arc<dyn JwtProvider> {
    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    {
        Arc::new(JsonwebtokenProvider)
    }

    #[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
    {
        Arc::new(DisabledJwtProvider)
    }
}

/// Issues the bearer token that accompanies a workspace API key.
#[derive(Clone)]
pub struct ApiTokenIssuer {
    jwt: JwtOptions,
    provider: Arc<dyn JwtProvider>,
}

impl std::fmt::Debug for ApiTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokenIssuer")
            .field("algorithm", &self.jwt.algorithm)
            .field("issuer", &self.jwt.issuer)
            .field("audience", &self.jwt.audience)
            .finish_non_exhaustive()
    }
}

impl ApiTokenIssuer {
    pub fn new(jwt: JwtOptions) -> Result<Self> {
        jwt.validate().map_err(|e| anyhow!(e))?;
        Ok(Self {
            jwt,
            provider: default_provider(),
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn JwtProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn options(&self) -> &JwtOptions {
        &self.jwt
    }

    /// Sign a token for `api_key_id` of `workspace_id`, valid until `expires_at`.
    pub fn issue(
        &self,
        workspace_id: Uuid,
        api_key_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let audience = self.jwt.audience.first().cloned().unwrap_or_default();
        let claims = ApiTokenClaims {
            sub: workspace_id.to_string(),
            workspace_id,
            jti: api_key_id,
            token_type: API_KEY_TOKEN_TYPE.to_string(),
            iss: self.jwt.issuer.clone(),
            aud: audience,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        self.provider.sign(&self.jwt, &claims)
    }

    /// Check signature, issuer, audience, expiry and token type.
    pub fn verify(&self, token: &str) -> Result<ApiTokenClaims> {
        let claims = self.provider.verify(&self.jwt, token)?;
        if claims.token_type != API_KEY_TOKEN_TYPE {
            return Err(KennelError::not_authenticated("Not an API key token").into_anyhow());
        }
        if claims.sub != claims.workspace_id.to_string() {
            return Err(KennelError::not_authenticated("Token subject mismatch").into_anyhow());
        }
        Ok(claims)
    }
}
