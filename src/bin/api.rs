use fred_analyst::{api::start_server, init_tracing, AppConfig, Orchestrator};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info,tower_http=info");

    // Fail fast on missing keys
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("⚠️  {}. Set GEMINI_API_KEY and FRED_API_KEY in the environment or .env", e);
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    info!("🚀 FRED Analyst - API Server");
    info!("📍 Port: {}", config.port);
    info!(
        model = %config.gemini_model,
        series = config.catalog.entries().len(),
        lookback_years = config.lookback_years,
        "Configuration loaded"
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, &config.bind_addr, config.port).await?;

    Ok(())
}
