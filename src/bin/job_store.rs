use pdf_job_tracker::{app_state::JobStoreState, config::AppConfig, db, routes, telemetry};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Initializing job store");

    tracing::info!(url = %config.jobs_database_url, "Opening job database");
    let db_pool = db::init_pool(&config.jobs_database_url)
        .await
        .expect("Failed to open job database");

    tracing::info!("Running job store migrations");
    db::run_job_migrations(&db_pool)
        .await
        .expect("Failed to run job store migrations");

    let app = routes::job_store_router(
        JobStoreState::new(db_pool),
        &config.db_auth_token,
        &config.allowed_origin,
    );

    let bind_addr = config.bind_addr_or(DEFAULT_BIND_ADDR);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Job store listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
