//! content-poll server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use content_poll_api::{AppState, CookieSettings, app};
use content_poll_common::{Config, KvCache, MemoryCache, RedisCache, TokenHasher};
use content_poll_core::{AnalyticsService, VoteService};
use content_poll_db::repositories::{PostRepository, VoteRepository};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Shared Redis cache when configured, in-process otherwise.
async fn build_cache(config: &Config) -> Arc<dyn KvCache> {
    let Some(redis) = &config.redis else {
        info!("Using in-process posts summary cache");
        return Arc::new(MemoryCache::new());
    };

    match RedisCache::connect(&redis.url, &redis.prefix).await {
        Ok(cache) => {
            info!("Connected to Redis for posts summary cache");
            Arc::new(cache)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, falling back to in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "content_poll=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting content-poll server...");

    let config = Config::load()?;
    let hasher = TokenHasher::new(&config.voting.token_secret)?;

    let db = content_poll_db::init(&config).await?;
    info!("Connected to database");

    // A failed step is retried on the next start; the ledger stays readable meanwhile.
    match content_poll_db::initialize(&db).await {
        Ok(version) => info!(version = %version, "Schema ready"),
        Err(e) => warn!(error = %e, "Schema migration incomplete, continuing"),
    }

    let cache = build_cache(&config).await;

    let db = Arc::new(db);
    let vote_repo = VoteRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));

    let analytics = AnalyticsService::new(vote_repo.clone(), post_repo, cache, &config.analytics);
    let votes = VoteService::new(vote_repo, analytics.clone());

    let state = AppState {
        votes,
        analytics,
        hasher: Arc::new(hasher),
        cookie: CookieSettings::from(&config.voting),
        admin_token: config
            .admin
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Arc::from),
    };
    if state.admin_token.is_none() {
        info!("Admin token not configured, admin endpoints disabled");
    }

    let router = app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
