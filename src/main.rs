use servicebook::app;
use servicebook::core::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load application config from environment variables
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, smtp={}, signing={:?}, hasher={:?}",
        config.has_database(),
        config.has_smtp(),
        config.jwt.signing,
        config.password_hasher
    );

    if let Err(e) = app::run(config).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}
