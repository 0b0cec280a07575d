use crate::ports::PolicyRepository;
use squid_tagger_domain::{DomainError, RuleRecord, SiteTagAssignment};
use std::sync::Arc;
use tracing::instrument;

pub struct DumpPolicyUseCase {
    repository: Arc<dyn PolicyRepository>,
}

impl DumpPolicyUseCase {
    pub fn new(repository: Arc<dyn PolicyRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn sites(&self) -> Result<Vec<SiteTagAssignment>, DomainError> {
        self.repository.dump_sites().await
    }

    #[instrument(skip(self))]
    pub async fn rules(&self) -> Result<Vec<RuleRecord>, DomainError> {
        self.repository.dump_rules().await
    }
}
