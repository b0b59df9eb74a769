//! kennel-core: framework-agnostic core for Kennel.
//!
//! Holds the data model, the collaborator traits the bootstrap saga talks to,
//! the saga engine itself and a few pure derivations used by record displays.

pub mod bootstrap;
pub mod config;
pub mod emails;
pub mod errors;
pub mod models;
pub mod saga;
pub mod services;
pub mod tenant;
pub mod urls;
pub mod validation;

pub use bootstrap::{BootstrapOptions, BootstrapOutcome, CreateUserAndWorkspace, WorkspaceBootstrap};
pub use config::{KennelConfig, KennelConfigSnapshot};
pub use errors::{ErrorKind, KennelError, KennelResult};
pub use saga::{RetryPolicy, Saga, SagaFailure, SagaReport, SagaState, SagaStep};
pub use services::Collaborators;
pub use tenant::{TenantContext, TenantId};
pub use urls::WorkspaceUrlBuilder;
