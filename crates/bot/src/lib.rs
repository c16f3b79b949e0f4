//! Storefront chat bot server.
//!
//! Receives chat events over a webhook, runs them against the user's session
//! and the catalog, and returns the replies to send. A background scheduler
//! broadcasts promos to every registered user. Observability is provided by
//! tracing and Prometheus metrics.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod faq;
mod handlers;
pub mod outbound;
pub mod reply;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use broadcast::{BroadcastConfig, BroadcastJob, InMemoryNotifier, Notifier};
use metrics_exporter_prometheus::PrometheusHandle;
use repository::{InMemoryLedger, InMemoryRepository, OrderLedger, Repository};
use session_store::{InMemorySessionStore, SessionStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use dispatcher::{DispatchSettings, Dispatcher, STALE_ACTION};
pub use error::{BotError, Result};

/// Broadcast job over type-erased collaborators.
pub type SharedBroadcastJob = Arc<BroadcastJob<dyn Repository, dyn Notifier>>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub broadcast: SharedBroadcastJob,
}

/// The external collaborators the bot is wired with.
#[derive(Clone)]
pub struct Services {
    pub repo: Arc<dyn Repository>,
    pub ledger: Arc<dyn OrderLedger>,
    pub sessions: Arc<dyn SessionStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// In-memory collaborators, kept concrete so callers can seed and inspect them.
#[derive(Clone, Default)]
pub struct InMemoryServices {
    pub repo: Arc<InMemoryRepository>,
    pub ledger: Arc<InMemoryLedger>,
    pub sessions: Arc<InMemorySessionStore>,
    pub notifier: Arc<InMemoryNotifier>,
}

impl InMemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(InMemorySessionStore::with_ttl(ttl)),
            ..Self::default()
        }
    }

    pub fn services(&self) -> Services {
        Services {
            repo: self.repo.clone(),
            ledger: self.ledger.clone(),
            sessions: self.sessions.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

/// Builds the dispatcher and broadcast job from `services`.
pub fn create_state(services: Services, config: &Config) -> Arc<AppState> {
    let broadcast = Arc::new(BroadcastJob::new(
        Arc::clone(&services.repo),
        services.notifier,
        BroadcastConfig {
            batch_size: config.broadcast_batch_size,
            notify_timeout: config.notify_timeout,
        },
    ));
    let dispatcher = Dispatcher::new(
        services.repo,
        services.ledger,
        services.sessions,
        DispatchSettings::from(config),
    );

    Arc::new(AppState {
        dispatcher,
        broadcast,
    })
}

/// Creates the default application state over in-memory collaborators.
pub fn create_default_state(config: &Config) -> (Arc<AppState>, InMemoryServices) {
    let services = match config.session_ttl {
        Some(ttl) => InMemoryServices::with_session_ttl(ttl),
        None => InMemoryServices::new(),
    };
    (create_state(services.services(), config), services)
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events", post(routes::events::handle))
        .route("/broadcast/status", get(routes::broadcast::status))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Periodically drops expired in-memory sessions until `shutdown` fires.
pub fn spawn_session_sweeper(
    store: Arc<InMemorySessionStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let purged = store.purge_expired().await;
                    if purged > 0 {
                        tracing::debug!(purged, "expired sessions purged");
                    }
                }
            }
        }
    })
}
