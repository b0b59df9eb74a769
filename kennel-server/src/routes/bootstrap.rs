use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use kennel_axum::{map_json_rejection, KennelAxumError};
use kennel_core::{BootstrapOutcome, CreateUserAndWorkspace, WorkspaceBootstrap};

pub const CREATE_USER_AND_WORKSPACE: &str = "/create-user-and-workspace";

pub fn router(bootstrap: Arc<WorkspaceBootstrap>) -> Router {
    Router::new()
        .route(CREATE_USER_AND_WORKSPACE, post(create_user_and_workspace))
        .with_state(bootstrap)
}

async fn create_user_and_workspace(
    State(bootstrap): State<Arc<WorkspaceBootstrap>>,
    body: Result<Json<CreateUserAndWorkspace>, JsonRejection>,
) -> Result<Json<BootstrapOutcome>, KennelAxumError> {
    let Json(input) = body.map_err(map_json_rejection)?;
    let outcome = bootstrap.create_user_and_workspace(input).await?;
    Ok(Json(outcome))
}
