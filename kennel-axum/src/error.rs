use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kennel_core::errors::KennelError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct KennelAxumError(pub anyhow::Error);

impl From<anyhow::Error> for KennelAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<KennelError> for KennelAxumError {
    fn from(e: KennelError) -> Self {
        Self(e.into_anyhow())
    }
}

impl KennelAxumError {
    /// The client-facing error this maps to.
    pub fn to_kennel_error(&self) -> KennelError {
        // A KennelError anywhere in the chain keeps its status and fields.
        if let Some(kennel) = KennelError::find(&self.0) {
            return kennel.sanitize_for_client();
        }

        // Anything else is an internal failure; its text stays in the logs.
        error!(error = ?self.0, "unhandled error");
        KennelError::general_error("Internal server error")
    }
}

impl IntoResponse for KennelAxumError {
    fn into_response(self) -> Response {
        let safe = self.to_kennel_error();
        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> KennelAxumError {
    KennelError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.body_text()]}))
        .into()
}
