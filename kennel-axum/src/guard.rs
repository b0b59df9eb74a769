use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use kennel_auth::ApiKeyGuard;
use kennel_core::errors::KennelError;

use crate::KennelAxumError;

/// Guard plus the parsed header it reads from.
#[derive(Clone)]
pub struct ApiKeyState {
    guard: Arc<ApiKeyGuard>,
    header: HeaderName,
}

impl ApiKeyState {
    pub fn new(guard: ApiKeyGuard) -> anyhow::Result<Self> {
        let header = HeaderName::from_bytes(guard.header_name().to_ascii_lowercase().as_bytes())
            .map_err(|e| {
                KennelError::general_error(format!(
                    "Invalid API key header `{}`: {e}",
                    guard.header_name()
                ))
                .into_anyhow()
            })?;
        Ok(Self {
            guard: Arc::new(guard),
            header,
        })
    }
}

/// Reject requests without one of the configured pre-shared keys.
pub async fn require_api_key(
    State(state): State<ApiKeyState>,
    request: Request,
    next: Next,
) -> Result<Response, KennelAxumError> {
    let presented = request
        .headers()
        .get(&state.header)
        .and_then(|v| v.to_str().ok());
    state.guard.check(presented)?;
    Ok(next.run(request).await)
}
