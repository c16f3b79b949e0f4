//! Bot server entry point.

use std::sync::Arc;

use bot::outbound::{HttpNotifier, TracingNotifier};
use bot::{Config, InMemoryServices, Services};
use broadcast::{BroadcastScheduler, Notifier};
use repository::{PostgresLedger, PostgresRepository};
use session_store::PostgresSessionStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.outbound_url {
        Some(url) => {
            let notifier = HttpNotifier::new(url.clone(), config.notify_timeout)
                .expect("failed to build HTTP client");
            tracing::info!(url = notifier.url(), "promo deliveries go to outbound gateway");
            Arc::new(notifier)
        }
        None => {
            tracing::warn!("OUTBOUND_URL not set, promo deliveries are only logged");
            Arc::new(TracingNotifier)
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut background = Vec::new();

    // 3. Wire stores, ledger and notifier
    let services = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let repo = PostgresRepository::new(pool.clone());
            repo.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL stores");

            Services {
                repo: Arc::new(repo),
                ledger: Arc::new(PostgresLedger::new(pool.clone())),
                sessions: Arc::new(PostgresSessionStore::new(pool)),
                notifier: notifier(&config),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            let memory = match config.session_ttl {
                Some(ttl) => {
                    let memory = InMemoryServices::with_session_ttl(ttl);
                    background.push(bot::spawn_session_sweeper(
                        Arc::clone(&memory.sessions),
                        ttl,
                        shutdown_rx.clone(),
                    ));
                    memory
                }
                None => InMemoryServices::new(),
            };
            Services {
                notifier: notifier(&config),
                ..memory.services()
            }
        }
    };

    // 4. Build state and start the promo scheduler
    let state = bot::create_state(services, &config);
    background.push(
        BroadcastScheduler::new(Arc::clone(&state.broadcast), config.broadcast_interval)
            .spawn(shutdown_rx),
    );

    // 5. Build the application
    let app = bot::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting bot server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Stop background tasks
    let _ = shutdown_tx.send(true);
    for task in background {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "background task panicked");
        }
    }

    tracing::info!("server shut down gracefully");
}
