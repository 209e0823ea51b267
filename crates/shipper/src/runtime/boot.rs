//! Boot — logging init, config load, initial database connect.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ShipperConfig;
use crate::store::mysql::MySqlFactory;
use crate::store::Gateway;

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load config, validate it, and establish the database session.
///
/// A connect failure here (after the gateway's own retries) is fatal by
/// design: the process cannot ship logs without storage.
pub async fn boot() -> Result<(ShipperConfig, Gateway), Box<dyn std::error::Error>> {
    info!("Starting nginx log shipper v0.0.1");

    let config = ShipperConfig::load()?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    info!(
        "Loaded configuration: db={}@{}:{}/{}",
        config.db.user, config.db.host, config.db.port, config.db.name
    );
    info!(
        "Log paths: access={}, error={}",
        config.access_log_path, config.error_log_path
    );

    let factory = MySqlFactory::new(&config.db);
    let gateway = Gateway::connect(Box::new(factory)).await.map_err(|e| {
        error!("Failed to connect to MySQL: {}", e);
        e
    })?;
    info!("Connected to MySQL at {}:{}", config.db.host, config.db.port);

    Ok((config, gateway))
}
