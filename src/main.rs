use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tier_rewards_server::{
    build_router, open_database, routes::ensure_staff_user, AppState, Clock, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tier_rewards_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tier Rewards Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // Open database (creates tables on first run)
    let db = open_database(&config.database_path)?;
    tokio::fs::create_dir_all(&config.media_root).await?;

    if let (Some(phone), Some(password)) = (&config.admin_phone, &config.admin_password) {
        match ensure_staff_user(&db, phone, password, Clock::System.timestamp()).await {
            Ok(Some(id)) => tracing::info!("Created staff account {} for {}", id, phone),
            Ok(None) => tracing::info!("Staff account for {} already exists", phone),
            Err(e) => return Err(anyhow::anyhow!("Failed to create staff account: {}", e)),
        }
    }

    // Configure CORS
    let origins = config
        .allowed_origins
        .iter()
        .map(|s| s.parse::<axum::http::HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
        ])
        .allow_headers(Any);

    let addr: SocketAddr = config.server_address().parse()?;
    let app = build_router(AppState::new(db, config)).layer(cors);

    // Start server
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
