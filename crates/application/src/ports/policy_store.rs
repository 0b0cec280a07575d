use async_trait::async_trait;
use squid_tagger_domain::{CandidateRow, DomainError, DomainLabels};
use std::net::IpAddr;

/// Read side of the policy store as seen by one worker.
///
/// A store value owns a single session and is never shared: `classify` takes
/// `&mut self`. Implementations connect lazily and reconnect after a broken
/// session.
#[async_trait]
pub trait PolicyStore: Send {
    /// Candidate rows whose site is an ancestor-or-self of `host` and whose
    /// rule network (if any) contains `client_ip`, most specific site first.
    async fn classify(
        &mut self,
        host: &DomainLabels,
        client_ip: IpAddr,
    ) -> Result<Vec<CandidateRow>, DomainError>;
}

/// Hands out one independent [`PolicyStore`] per worker.
pub trait PolicyStoreFactory: Send + Sync {
    fn create(&self) -> Box<dyn PolicyStore>;
}
