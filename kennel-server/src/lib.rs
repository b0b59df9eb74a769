//! kennel-server: the HTTP surface of the workspace bootstrap, wired to the
//! in-memory collaborators.

pub mod config;
pub mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use kennel_auth::{ApiKeyGuard, ApiTokenIssuer, AuthOptions};
use kennel_axum::AxumApp;
use kennel_core::models::NewUser;
use kennel_core::{
    BootstrapOptions, KennelConfig, KennelConfigSnapshot, WorkspaceBootstrap, WorkspaceUrlBuilder,
};
use kennel_memory::{MemoryBackend, MemoryStore};
use tracing::info;

pub struct Server {
    pub config: KennelConfigSnapshot,
    pub store: Arc<MemoryStore>,
    pub issuer: ApiTokenIssuer,
    pub bootstrap: Arc<WorkspaceBootstrap>,
    app: AxumApp,
}

impl Server {
    pub fn router(&self) -> Router {
        self.app.clone().into_router()
    }

    pub async fn listen(self) -> Result<()> {
        let addr = config::listen_addr(&self.config);
        self.app.listen(addr).await
    }
}

/// Wire options, backend, orchestrator and routes from `config`.
pub async fn build(config: &KennelConfig) -> Result<Server> {
    let snapshot = config.snapshot();

    let auth = AuthOptions::from_config(&snapshot)?;
    let options = BootstrapOptions::from_config(&snapshot)?;
    let base_url = snapshot
        .get_string("urls.base")
        .unwrap_or_else(|| "https://kennel.dev".to_string());
    let urls = WorkspaceUrlBuilder::new(&base_url)?;

    let store = Arc::new(MemoryStore::new());
    let support = store
        .seed_user(NewUser {
            email: options.support_email.clone(),
            first_name: "Kennel".to_string(),
            last_name: "Support".to_string(),
            picture: None,
            locale: None,
        })
        .await?;
    info!(user_id = %support.id, "support account seeded");

    let issuer = ApiTokenIssuer::new(auth.jwt.clone())?;
    let backend = MemoryBackend::new(store.clone(), issuer.clone());
    let bootstrap = Arc::new(WorkspaceBootstrap::new(backend.collaborators(), urls, options)?);

    let app = AxumApp::new()
        .use_get("/health", routes::health::health)
        .protected(
            routes::AUTH_API,
            routes::bootstrap::router(bootstrap.clone()),
            ApiKeyGuard::new(&auth.api_key),
        )?;

    Ok(Server {
        config: snapshot,
        store,
        issuer,
        bootstrap,
        app,
    })
}
