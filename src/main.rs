//! Circulation Server - school library borrowing, reservations and fines
//!
//! REST API server with a background overdue / expiry sweep.

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulation_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{redis::RedisService, sweeper::Sweeper, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("circulation_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Circulation Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let redis_service = RedisService::new(&config.redis.url).await?;

    tracing::info!("Connected to Redis");

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let repository = Repository::new(pool);
    let services = Arc::new(Services::new(
        repository,
        config.circulation.clone(),
        config.email.clone(),
        redis_service,
    ));

    let _sweeper = Sweeper::spawn(services.clone());

    let state = AppState {
        config: Arc::new(config),
        services,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Borrow records
        .route("/borrow-records", get(api::borrow_records::list_borrow_records))
        .route("/borrow-records", post(api::borrow_records::create_borrow_record))
        .route("/borrow-records/:id", get(api::borrow_records::get_borrow_record))
        .route("/borrow-records/:id", delete(api::borrow_records::delete_borrow_record))
        .route("/borrow-records/:id/approve", post(api::borrow_records::approve_borrow_record))
        .route("/borrow-records/:id/reject", post(api::borrow_records::reject_borrow_record))
        .route("/borrow-records/:id/return", post(api::borrow_records::return_borrow_record))
        .route("/borrow-records/:id/renew", post(api::borrow_records::renew_borrow_record))
        .route("/borrow-records/:id/mark-overdue", post(api::borrow_records::mark_overdue))
        .route("/borrow-records/:id/cancel", post(api::borrow_records::cancel_borrow_record))
        .route("/borrow-records/:id/fine", post(api::borrow_records::fine_borrow_record))
        .route("/borrow-records/:id/remind", post(api::borrow_records::remind_borrow_record))
        // Reservations
        .route("/reservations", get(api::reservations::list_reservations))
        .route("/reservations", post(api::reservations::create_reservation))
        .route("/reservations/expiring-soon", get(api::reservations::expiring_soon))
        .route("/reservations/:id", get(api::reservations::get_reservation))
        .route("/reservations/:id/fulfill", post(api::reservations::fulfill_reservation))
        .route("/reservations/:id/cancel", post(api::reservations::cancel_reservation))
        .route("/reservations/:id/expire", post(api::reservations::expire_reservation))
        .route("/books/:id/reservations", get(api::reservations::list_book_reservations))
        // Fines
        .route("/fines", get(api::fines::list_fines))
        .route("/fines", post(api::fines::create_fine))
        .route("/fines/:id", get(api::fines::get_fine))
        .route("/fines/:id/pay", post(api::fines::pay_fine))
        .route("/fines/:id/waive", post(api::fines::waive_fine))
        // Physical copies
        .route("/physical-copies/:id", get(api::physical_copies::get_copy))
        .route("/physical-copies/:id/status", patch(api::physical_copies::update_copy_status))
        // Readers
        .route("/readers", post(api::readers::create_reader))
        .route("/readers/:id", get(api::readers::get_reader))
        .route("/reader-types", get(api::readers::list_reader_types))
        // Statistics
        .route("/stats/borrow-records", get(api::stats::get_borrow_stats))
        .route("/stats/overdue", get(api::stats::get_overdue_stats))
        .route("/stats/fines", get(api::stats::get_fine_stats))
        .route("/stats/reservations", get(api::stats::get_reservation_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), api::idempotency_guard))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
