use async_trait::async_trait;
use squid_tagger_domain::{DomainError, RuleRecord, SiteTagAssignment};

/// Bulk access to policy data, used by the dump/load commands only.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// All site assignments ordered by site, then tags
    async fn dump_sites(&self) -> Result<Vec<SiteTagAssignment>, DomainError>;

    /// Insert assignments in one transaction, optionally deleting existing
    /// ones first. Returns the number of rows inserted.
    async fn load_sites(
        &self,
        rows: Vec<SiteTagAssignment>,
        flush: bool,
    ) -> Result<u64, DomainError>;

    async fn dump_rules(&self) -> Result<Vec<RuleRecord>, DomainError>;

    /// Replace the whole rule table in one transaction
    async fn replace_rules(&self, rows: Vec<RuleRecord>) -> Result<u64, DomainError>;
}
