use std::sync::Arc;

use modeler_core::kernel::TruckKernel;
use modeler_core::ModelBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod routes;

use config::ServerConfig;

// Application State
pub struct AppState {
    builder: ModelBuilder<TruckKernel>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            builder: ModelBuilder::with_options(TruckKernel::new(), config.build.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        policy = ?config.build.extrude_policy,
        cut_depth = config.build.cut_fallback_depth,
        "modeler {} starting",
        modeler_core::version()
    );

    let state = Arc::new(AppState::new(&config));
    let app = routes::router(state, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("listening on {}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
