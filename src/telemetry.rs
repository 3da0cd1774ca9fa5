use tracing_subscriber::EnvFilter;

/// Install the JSON log subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();
}
