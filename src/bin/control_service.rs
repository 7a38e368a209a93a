use std::sync::Arc;

use tracing::info;
use whiteboard_services::{
    api::{
        build_control_router,
        control::{ControlState, ProcessRunner},
        routes::CONTROL_SERVICE,
    },
    observability, server, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_default_location()?;
    observability::init_tracing(&config.logging)?;

    info!(
        "Control script: {} {}",
        config.runner.interpreter,
        config.runner.script_path.display()
    );

    let runner = ProcessRunner::new(config.runner.clone());
    let state = ControlState::new(Arc::new(runner));
    let app = build_control_router(state, &config.control);

    server::serve(app, &config.control, CONTROL_SERVICE).await?;
    Ok(())
}
