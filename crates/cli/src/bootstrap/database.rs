use squid_tagger_domain::config::DatabaseConfig;
use squid_tagger_infrastructure::database::{create_pool, probe, run_migrations};
use sqlx::PgPool;
use tracing::{error, info};

/// Connect, confirm the store answers and bring the schema up to date.
/// Any failure here is fatal.
pub async fn init_database(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    info!(
        host = cfg.host.as_deref().unwrap_or("<default>"),
        port = cfg.port,
        database = %cfg.database,
        user = %cfg.user,
        "Connecting to policy store"
    );

    let pool = create_pool(cfg).await.map_err(|e| {
        error!("Failed to connect to policy store: {}", e);
        anyhow::anyhow!(e)
    })?;

    probe(&pool).await.map_err(|e| {
        error!("Policy store probe failed: {}", e);
        anyhow::anyhow!(e)
    })?;

    if cfg.migrate {
        run_migrations(&pool).await.map_err(|e| {
            error!("Failed to apply migrations: {}", e);
            anyhow::anyhow!(e)
        })?;
    }

    Ok(pool)
}
