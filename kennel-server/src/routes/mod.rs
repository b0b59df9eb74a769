pub mod bootstrap;
pub mod health;

/// Prefix of the API-key protected routes.
pub const AUTH_API: &str = "/auth/api";
