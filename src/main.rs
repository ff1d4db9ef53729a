use anyhow::Result;
use multilingual_dictionary::{config::Config, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when not present)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_dictionary=info".parse()?),
        )
        .init();

    info!("Starting multilingual dictionary");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!(
        "Model {} via {}, trigger policy {:?}",
        config.model_name, config.model_api_url, config.trigger_policy
    );

    let state = server::AppState::from_config(config);
    server::serve(state).await
}
