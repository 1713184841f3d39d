use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movielog::app;
use movielog::config::AppConfig;

/// Main entry point for the web application
///
/// Reads configuration from the environment (a `.env` file is honored),
/// connects to the configured spreadsheet and serves the app. A missing or
/// invalid configuration is fatal: the error is logged and the process
/// exits non-zero.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movielog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    app::run(config).await
}
