use squid_tagger_domain::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Log to stderr; stdout carries the redirector protocol.
///
/// `RUST_LOG` takes precedence over `log.level`. Silent mode installs no
/// subscriber at all.
pub fn init_logging(config: &Config) {
    if config.log.silent {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(false)
        .init();

    info!("Logging initialized at level: {}", config.log.level);
}
