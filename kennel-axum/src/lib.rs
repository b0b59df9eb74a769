//! kennel-axum: Axum adapter for Kennel.
//!
//! Error responses in the Kennel JSON shape, the pre-shared API key
//! middleware and a small app builder adding request ids and tracing.

pub mod app;
pub mod guard;
mod error;

pub use app::AxumApp;
pub use error::{map_json_rejection, KennelAxumError};
pub use guard::{require_api_key, ApiKeyState};
