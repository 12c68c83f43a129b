use lume_social::config::Settings;
use lume_social::services::PostgresClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration; LUME_CONFIG points at a single file
    let loaded = match std::env::var("LUME_CONFIG") {
        Ok(path) => Settings::load_from(path),
        Err(_) => Settings::load(),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Lume Social schema maintenance...");
    info!(
        "Paging: default {} per page, max {}",
        settings.paging.default_page_size, settings.paging.max_page_size
    );

    // Connecting applies pending migrations
    let postgres = match PostgresClient::from_settings(&settings.database).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to PostgreSQL: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    info!("Migrations applied");

    match postgres.health_check().await {
        Ok(true) => {
            info!("PostgreSQL healthy");
            Ok(())
        }
        Ok(false) | Err(_) => {
            error!("PostgreSQL health check failed");
            Err(std::io::Error::new(std::io::ErrorKind::Other, "health check failed"))
        }
    }
}
