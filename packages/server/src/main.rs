use std::net::SocketAddr;

use tracing::{Level, info};

use registry::blob::upload_size;
use registry::config::AppConfig;
use registry::state::AppState;
use registry::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database).await?;
    info!("Database schema synced");

    seed::seed_projects(&db, &config.projects.seed).await?;

    let sizes = upload_size::from_config(&config.cache).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let upstream = config.upstream.url.clone();
    let state = AppState::new(config, db, sizes);
    let app = build_router(state);

    info!("Registry ledger listening on http://{} (upstream {})", addr, upstream);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
