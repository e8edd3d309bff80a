use std::sync::Arc;

use anyhow::{Context, Result};

use club_risk::api;
use club_risk::assessment::RiskService;
use club_risk::config::{self, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter())
        .init();

    let config = ServiceConfig::from_env();
    let service = RiskService::load(&config).with_context(|| {
        format!(
            "load risk service (data {}, model {})",
            config.data_path.display(),
            config.model_path.display()
        )
    })?;

    api::serve(&config, Arc::new(service)).await
}
