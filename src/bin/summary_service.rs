use std::sync::Arc;

use tracing::{info, warn};
use whiteboard_services::{
    api::{
        build_summary_router,
        routes::SUMMARY_SERVICE,
        summary::{GeminiClient, SummaryState},
    },
    observability, server, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_default_location()?;
    observability::init_tracing(&config.logging)?;

    if config.model.api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set; model requests will be rejected upstream");
    }

    info!(
        "Using model {} (max retries {})",
        config.model.model, config.model.max_retries
    );

    let client = GeminiClient::new(config.model.clone())?;
    let state = SummaryState::new(Arc::new(client));
    let app = build_summary_router(state, &config.summary);

    server::serve(app, &config.summary, SUMMARY_SERVICE).await?;
    Ok(())
}
