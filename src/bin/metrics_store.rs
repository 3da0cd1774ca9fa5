use pdf_job_tracker::{
    app_state::MetricsStoreState, config::AppConfig, db, routes, services::retention, telemetry,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8788";

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Initializing metrics store");

    tracing::info!(url = %config.metrics_database_url, "Opening metrics database");
    let db_pool = db::init_pool(&config.metrics_database_url)
        .await
        .expect("Failed to open metrics database");

    tracing::info!("Running metrics store migrations");
    db::run_metrics_migrations(&db_pool)
        .await
        .expect("Failed to run metrics store migrations");

    // Retention sweep
    let schedule = retention::parse_schedule(&config.metrics_prune_schedule)
        .expect("Invalid METRICS_PRUNE_SCHEDULE");
    tracing::info!(
        schedule = %config.metrics_prune_schedule,
        retention_days = config.metrics_retention_days,
        "Scheduling metrics retention sweep"
    );
    tokio::spawn(retention::run_scheduled(
        db_pool.clone(),
        schedule,
        config.metrics_retention_days,
    ));

    let app = routes::metrics_store_router(
        MetricsStoreState::new(db_pool),
        &config.metrics_auth_token,
    );

    let bind_addr = config.bind_addr_or(DEFAULT_BIND_ADDR);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Metrics store listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
