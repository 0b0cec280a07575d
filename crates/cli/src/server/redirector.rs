use crate::bootstrap::init_database;
use squid_tagger_application::services::{PatternCache, RuleMatcher};
use squid_tagger_application::use_cases::ClassifyRequestUseCase;
use squid_tagger_domain::Config;
use squid_tagger_infrastructure::database::connect_options;
use squid_tagger_infrastructure::redirector::Dispatcher;
use squid_tagger_infrastructure::repositories::PgPolicyStoreFactory;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    Signal,
}

pub async fn run_redirector(config: &Config) -> anyhow::Result<StopReason> {
    // Startup check only; workers open their own sessions.
    let pool = init_database(&config.database).await?;
    pool.close().await;

    let factory = PgPolicyStoreFactory::new(
        connect_options(&config.database),
        config.redirector.query_timeout(),
    );
    let use_case = Arc::new(ClassifyRequestUseCase::new(Arc::new(RuleMatcher::new(
        Arc::new(PatternCache::new()),
    ))));

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let dispatcher =
        Dispatcher::new(&config.redirector, factory, use_case).with_cancellation(shutdown.clone());
    let summary = dispatcher
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await?;

    info!(
        lines = summary.lines,
        requests = summary.requests,
        malformed = summary.malformed,
        "Redirector stopped"
    );

    Ok(if shutdown.is_cancelled() {
        StopReason::Signal
    } else {
        StopReason::EndOfInput
    })
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
            _ = terminate.recv() => info!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
        }
    }

    shutdown.cancel();
}
