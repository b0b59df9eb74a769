//! kennel-auth: credentials for Kennel.
//!
//! Pre-shared API keys protect the bootstrap endpoint; the bootstrap itself
//! ends by issuing a signed API token for the new workspace.

pub mod guard;
pub mod options;
pub mod token;

pub use guard::ApiKeyGuard;
pub use options::{ApiKeyOptions, AuthOptions, AuthOptionsBuilder, JwtAlgorithm, JwtOptions};
pub use token::{ApiTokenClaims, ApiTokenIssuer, JwtProvider, API_KEY_TOKEN_TYPE};
