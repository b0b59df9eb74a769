use axum::handler::Handler;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use kennel_auth::ApiKeyGuard;
use kennel_core::errors::KennelError;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::guard::{require_api_key, ApiKeyState};
use crate::KennelAxumError;

#[derive(Clone)]
pub struct AxumApp {
    router: Router<()>,
}

async fn not_found() -> KennelAxumError {
    KennelError::not_found("Page not found").into()
}

impl Default for AxumApp {
    fn default() -> Self {
        Self::new()
    }
}

impl AxumApp {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = if path.is_empty() || path == "/" {
            self.router.merge(router)
        } else {
            self.router.nest(path, router)
        };
        self
    }

    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Mount `router` at `path` behind the pre-shared API key check.
    pub fn protected(
        self,
        path: &str,
        router: Router<()>,
        guard: ApiKeyGuard,
    ) -> anyhow::Result<Self> {
        let state = ApiKeyState::new(guard)?;
        let router = router.route_layer(middleware::from_fn_with_state(state, require_api_key));
        Ok(self.use_router(path, router))
    }

    /// Final router: JSON 404s, request ids and request tracing.
    pub fn into_router(self) -> Router<()> {
        self.router.fallback(not_found).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
