use anyhow::Context;
use tracing::info;

use yatube_api::auth::AppStateInner;
use yatube_api::config::Config;
use yatube_api::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatube=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let addr = config.bind_addr()?;

    // Init database
    let db = yatube_db::Database::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    info!(
        "Page size {}, index cache {:?}, follow policy {}",
        config.page_size, config.index_cache_ttl, config.follow_policy
    );

    let state = AppStateInner::new(db, config);
    let app = router::build(state);

    info!("yatube listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
