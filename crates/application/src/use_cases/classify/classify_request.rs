use crate::ports::PolicyStore;
use crate::services::{MatchContext, RuleMatcher};
use chrono::{Local, NaiveDateTime};
use squid_tagger_domain::{Decision, Request};
use std::sync::Arc;
use tracing::{error, warn};

/// Classify one request: store round trip, then rule matching.
///
/// Never fails. Anything that prevents a decision (unusable host, store
/// failure, timeout) is logged and answered with PASS so a single bad
/// request never stops a worker.
pub struct ClassifyRequestUseCase {
    matcher: Arc<RuleMatcher>,
}

impl ClassifyRequestUseCase {
    pub fn new(matcher: Arc<RuleMatcher>) -> Self {
        Self { matcher }
    }

    pub async fn execute(&self, store: &mut dyn PolicyStore, request: &Request) -> Decision {
        self.execute_at(store, request, Local::now().naive_local())
            .await
    }

    pub async fn execute_at(
        &self,
        store: &mut dyn PolicyStore,
        request: &Request,
        now: NaiveDateTime,
    ) -> Decision {
        let labels = match request.labels() {
            Ok(labels) => labels,
            Err(e) => {
                warn!(id = %request.id, host = %request.host, error = %e, "Unusable host; passing request");
                return Decision::Pass;
            }
        };

        let rows = match store.classify(&labels, request.client_ip).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    id = %request.id,
                    host = %request.host,
                    client = %request.client_ip,
                    error = %e,
                    "Policy store lookup failed; passing request"
                );
                return Decision::Pass;
            }
        };

        let ctx = MatchContext {
            host: &request.host,
            path: &request.path,
            now,
        };
        self.matcher.decide(&rows, &ctx)
    }
}
