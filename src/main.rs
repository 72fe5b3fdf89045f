//! Shelfmark Server - library lending backend

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfmark_server::{
    api,
    config::{AppConfig, LoggingConfig, SupportConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs get flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Shelfmark Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(repository, &config);

    if let Some(ref admin) = config.bootstrap_admin {
        services
            .users
            .ensure_bootstrap_admin(admin)
            .await
            .context("Failed to create bootstrap staff account")?;
    }

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state)?;

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Peer addresses feed the support rate limiter
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Console output (pretty or JSON) plus optional daily-rotated log files
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("shelfmark_server={},tower_http=debug", logging.level).into());

    let (json_layer, pretty_layer) = if logging.format.eq_ignore_ascii_case("json") {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    let (file_layer, guard) = match logging.directory.as_deref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "shelfmark.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .init();

    guard
}

/// Anonymous support submissions are rate limited per client IP
fn support_submit_router(support: &SupportConfig) -> anyhow::Result<Router<AppState>> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(support.per_second)
        .burst_size(support.burst_size)
        .finish()
        .context("Invalid support rate limit configuration")?;

    Ok(Router::new()
        .route("/support", post(api::support::submit_message))
        .layer(GovernorLayer {
            config: Arc::new(governor_conf),
        }))
}

/// Create the application router with all routes
fn create_router(state: AppState) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/token", post(api::auth::obtain_token))
        .route("/token/refresh", post(api::auth::refresh_token))
        // Catalog
        .route("/authors", get(api::authors::list_authors).post(api::authors::create_author))
        .route(
            "/authors/:id",
            get(api::authors::get_author)
                .put(api::authors::update_author)
                .delete(api::authors::delete_author),
        )
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        // Lending
        .route("/borrow", post(api::borrows::borrow_book))
        .route("/return", post(api::borrows::return_book))
        .route("/report-lost", post(api::borrows::report_lost))
        .route("/approve-fine", post(api::borrows::approve_fine))
        .route("/my-borrows", get(api::borrows::my_borrows))
        .route("/borrows", get(api::borrows::list_borrows))
        // Claims
        .route("/claims", get(api::claims::list_claims).post(api::claims::create_claim))
        .route("/claims/review", post(api::claims::review_claim))
        .route(
            "/claims/:id",
            get(api::claims::get_claim).delete(api::claims::delete_claim),
        )
        .route("/claims/:id/:action", post(api::claims::claim_action))
        // Admin
        .route("/admin/users", get(api::users::list_users).post(api::users::create_user))
        .route("/admin/users/:id/status", post(api::users::update_user_status))
        // Support
        .route("/support", get(api::support::list_messages))
        .route("/support/:id/processed", post(api::support::mark_processed))
        .merge(support_submit_router(&state.config.support)?)
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Ok(Router::new()
        .nest("/api", api_routes)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}
