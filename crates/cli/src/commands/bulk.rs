use crate::bootstrap::init_database;
use squid_tagger_application::use_cases::{DumpPolicyUseCase, LoadPolicyUseCase};
use squid_tagger_domain::Config;
use squid_tagger_infrastructure::bulk;
use squid_tagger_infrastructure::repositories::PgPolicyRepository;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::info;

async fn repository(config: &Config) -> anyhow::Result<Arc<PgPolicyRepository>> {
    let pool = init_database(&config.database).await?;
    Ok(Arc::new(PgPolicyRepository::new(pool)))
}

pub async fn dump_sites(config: &Config) -> anyhow::Result<()> {
    let rows = DumpPolicyUseCase::new(repository(config).await?).sites().await?;
    let count = rows.len();

    spawn_blocking(move || bulk::write_sites(BufWriter::new(io::stdout().lock()), &rows)).await??;

    info!(rows = count, "Site assignments dumped");
    Ok(())
}

pub async fn load_sites(config: &Config, flush: bool) -> anyhow::Result<()> {
    let rows = spawn_blocking(|| bulk::read_sites(BufReader::new(io::stdin().lock()))).await??;

    let report = LoadPolicyUseCase::new(repository(config).await?)
        .load_sites(rows, flush)
        .await?;

    info!(
        inserted = report.inserted,
        invalid_patterns = report.invalid_patterns,
        "Site assignments loaded"
    );
    Ok(())
}

pub async fn dump_rules(config: &Config) -> anyhow::Result<()> {
    let rows = DumpPolicyUseCase::new(repository(config).await?).rules().await?;
    let count = rows.len();

    spawn_blocking(move || bulk::write_rules(BufWriter::new(io::stdout().lock()), &rows)).await??;

    info!(rows = count, "Rules dumped");
    Ok(())
}

pub async fn load_rules(config: &Config) -> anyhow::Result<()> {
    let rows = spawn_blocking(|| bulk::read_rules(BufReader::new(io::stdin().lock()))).await??;

    let report = LoadPolicyUseCase::new(repository(config).await?)
        .replace_rules(rows)
        .await?;

    info!(inserted = report.inserted, "Rules loaded");
    Ok(())
}

/// Convert a SquidGuard database directory to site/tag CSV on stdout. Needs
/// no database connection.
pub async fn import_squidguard(dir: PathBuf) -> anyhow::Result<()> {
    let count = spawn_blocking(move || {
        let entries = bulk::convert_directory(&dir)?;
        bulk::write_csv(BufWriter::new(io::stdout().lock()), &entries)?;
        Ok::<_, squid_tagger_domain::DomainError>(entries.len())
    })
    .await??;

    info!(rows = count, "SquidGuard lists converted");
    Ok(())
}
