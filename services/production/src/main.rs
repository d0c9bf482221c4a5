use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};

use bomforge_database::{initialize_database, postgres_health_check, Stores};
use bomforge_production::create_app;
use bomforge_utils::{init_logging, AppConfig, StorageBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|_| {
        eprintln!("Failed to load configuration, using defaults");
        AppConfig::default()
    });

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Starting Bomforge production service");

    let stores = match config.database.backend {
        StorageBackend::Postgres => {
            let db_config = bomforge_database::DatabaseConfig {
                postgres_url: config.database.postgres_url.clone(),
                max_connections: config.database.max_connections,
                connection_timeout: Duration::from_secs(config.database.connection_timeout_seconds),
                run_migrations: config.database.run_migrations,
            };
            let pool = initialize_database(&db_config).await?;
            postgres_health_check(&pool).await?;
            info!("Database connection established");
            Stores::postgres(pool)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on shutdown");
            Stores::in_memory()
        }
    };

    let app = create_app(stores, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Production service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
