//! In-memory GoodTrip backend.
//!
//! Serves the same REST surface as the real backend (auth, trips, notes,
//! country visits, follows) with JWT bearer authentication. Used by the
//! client's contract tests and runnable on its own as `goodtrip-mock-server`.

pub mod auth;
pub mod middleware;
pub mod social;
pub mod store;
pub mod trips;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use auth::{AppState, AppStateInner};
pub use store::{Store, StoreError, UserRecord};

use crate::middleware::{count_requests, require_auth};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    // Path parameters share one name per prefix so the routes don't conflict.
    let protected_routes = Router::new()
        .route("/auth/photo/{id}", post(auth::update_photo))
        .route("/trip/all/{id}", get(trips::user_trips))
        .route(
            "/trip/{id}",
            get(trips::get_trip)
                .post(trips::add_trip)
                .delete(trips::delete_trip),
        )
        .route(
            "/trip/note/{id}",
            get(trips::get_note)
                .post(trips::add_note)
                .delete(trips::delete_note),
        )
        .route(
            "/trip/country/{id}",
            post(trips::add_country_visit).delete(trips::delete_country_visit),
        )
        .route("/users/{id}/followers", get(social::followers))
        .route("/users/{id}/subscriptions", get(social::subscriptions))
        .route(
            "/users/{id}/follow/{handle}",
            post(social::follow).delete(social::unfollow),
        )
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(from_fn_with_state(state, count_requests))
        .layer(TraceLayer::new_for_http())
}

/// A running mock backend. The server stops when this is dropped.
pub struct MockServer {
    addr: SocketAddr,
    state: AppState,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Start on an ephemeral localhost port.
    pub async fn start() -> anyhow::Result<Self> {
        Self::bind("127.0.0.1:0".parse()?, AppStateInner::new("goodtrip-mock-secret")).await
    }

    pub async fn bind(addr: SocketAddr, state: AppState) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Mock server stopped: {}", e);
            }
        });

        info!("GoodTrip mock backend listening on {}", addr);
        Ok(Self { addr, state, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &Store {
        &self.state.store
    }

    /// Requests received so far, including rejected ones.
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Resolves when the server task ends.
    pub async fn wait(mut self) -> anyhow::Result<()> {
        (&mut self.task).await?;
        Ok(())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
