#![allow(dead_code)]

use async_trait::async_trait;
use squid_tagger_application::ports::{PolicyStore, PolicyStoreFactory};
use squid_tagger_application::services::{PatternCache, RuleMatcher};
use squid_tagger_application::use_cases::ClassifyRequestUseCase;
use squid_tagger_domain::{
    CandidateRow, DomainError, DomainLabels, Request, RequestId, RuleRecord, SiteTagAssignment,
    TagSet,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub fn site(host: &str, tags: &str, regexp: Option<&str>) -> SiteTagAssignment {
    SiteTagAssignment::new(
        DomainLabels::parse(host).unwrap(),
        tags.parse::<TagSet>().unwrap(),
        regexp.map(|r| r.to_string()),
    )
}

pub fn rule(tags: &str, redirect_url: &str) -> RuleRecord {
    RuleRecord::unconditional(redirect_url, tags.parse::<TagSet>().unwrap())
}

pub fn request(id: &str, host: &str, path: &str) -> Request {
    Request::new(
        RequestId::parse(id).unwrap(),
        host,
        path,
        "10.0.0.1".parse().unwrap(),
    )
}

pub fn classify_use_case() -> Arc<ClassifyRequestUseCase> {
    Arc::new(ClassifyRequestUseCase::new(Arc::new(RuleMatcher::new(
        Arc::new(PatternCache::new()),
    ))))
}

// ============================================================================
// In-memory PolicyStore
// ============================================================================

/// Filters and orders like the SQL query: ancestor-or-self sites with
/// overlapping tags and a network containing the client, deepest site first.
#[derive(Clone)]
pub struct MockPolicyStore {
    sites: Arc<Vec<SiteTagAssignment>>,
    rules: Arc<Vec<RuleRecord>>,
    call_count: Arc<AtomicU64>,
    should_fail: Arc<AtomicBool>,
    gate: Option<Arc<Semaphore>>,
}

impl MockPolicyStore {
    pub fn new(sites: Vec<SiteTagAssignment>, rules: Vec<RuleRecord>) -> Self {
        Self {
            sites: Arc::new(sites),
            rules: Arc::new(rules),
            call_count: Arc::new(AtomicU64::new(0)),
            should_fail: Arc::new(AtomicBool::new(false)),
            gate: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Every lookup waits for a permit from `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PolicyStore for MockPolicyStore {
    async fn classify(
        &mut self,
        host: &DomainLabels,
        client_ip: IpAddr,
    ) -> Result<Vec<CandidateRow>, DomainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| DomainError::StoreUnavailable("gate closed".to_string()))?
                .forget();
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::StoreUnavailable("connection refused".to_string()));
        }

        let mut rows = Vec::new();
        for site in self.sites.iter().filter(|s| s.site.is_ancestor_or_self_of(host)) {
            for rule in self.rules.iter().filter(|r| r.tags.intersects(&site.tags)) {
                if rule.netmask.is_some_and(|net| !net.contains(client_ip)) {
                    continue;
                }
                let mut row = CandidateRow::new(site.site.len(), &rule.redirect_url);
                if let Some(regexp) = site.regexp.as_deref() {
                    row = row.with_regexp(regexp);
                }
                if let Some(window) = rule.schedule()? {
                    row = row.with_schedule(window);
                }
                rows.push(row);
            }
        }

        // Same ordering as the classification query: deepest site first,
        // then rows with a path pattern ahead of unconditional ones.
        rows.sort_by(|a, b| {
            b.site_depth
                .cmp(&a.site_depth)
                .then_with(|| a.regexp.is_none().cmp(&b.regexp.is_none()))
        });
        Ok(rows)
    }
}

pub struct MockPolicyStoreFactory {
    store: MockPolicyStore,
    created: AtomicU64,
}

impl MockPolicyStoreFactory {
    pub fn new(store: MockPolicyStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            created: AtomicU64::new(0),
        })
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

impl PolicyStoreFactory for MockPolicyStoreFactory {
    fn create(&self) -> Box<dyn PolicyStore> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(self.store.clone())
    }
}
