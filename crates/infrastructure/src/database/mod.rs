use squid_tagger_domain::config::DatabaseConfig;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection options for the policy store. Unset fields fall back to the
/// usual `PG*` environment variables.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .application_name("squid-tagger");

    if let Some(host) = config.host.as_deref() {
        options = options.host(host);
    }
    if let Some(password) = config.password.as_deref() {
        options = options.password(password);
    }

    options
}

/// Small pool used by the bulk modes and the startup checks. The redirector
/// workers hold their own dedicated connections.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options(config))
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    MIGRATOR.run(pool).await?;
    info!("Database schema is up to date");
    Ok(())
}

/// Cheap round trip confirming the store answers queries.
pub async fn probe(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
