#![allow(dead_code)]

use async_trait::async_trait;
use squid_tagger_application::ports::{PolicyRepository, PolicyStore, PolicyStoreFactory};
use squid_tagger_domain::{
    CandidateRow, DomainError, DomainLabels, RuleRecord, SiteTagAssignment, TagSet,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Policy fixtures
// ============================================================================

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

pub fn rule_for_network(tags: &str, redirect_url: &str, netmask: &str) -> RuleRecord {
    let mut rule = rule(tags, redirect_url);
    rule.netmask = Some(netmask.parse().unwrap());
    rule
}

// ============================================================================
// Mock PolicyStore
// ============================================================================

#[derive(Default)]
struct PolicyData {
    sites: Vec<SiteTagAssignment>,
    rules: Vec<RuleRecord>,
}

/// In-memory store with the same filtering and ordering as the SQL query:
/// ancestor-or-self sites, overlapping tags, client inside the rule
/// network, most specific site first, then insertion order.
#[derive(Clone)]
pub struct MockPolicyStore {
    data: Arc<RwLock<PolicyData>>,
    call_count: Arc<AtomicU64>,
    should_fail: Arc<AtomicBool>,
}

impl MockPolicyStore {
    pub fn new() -> Self {
        Self::with_policy(Vec::new(), Vec::new())
    }

    pub fn with_policy(sites: Vec<SiteTagAssignment>, rules: Vec<RuleRecord>) -> Self {
        Self {
            data: Arc::new(RwLock::new(PolicyData { sites, rules })),
            call_count: Arc::new(AtomicU64::new(0)),
            should_fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub async fn add_site(&self, site: SiteTagAssignment) {
        self.data.write().await.sites.push(site);
    }

    pub async fn add_rule(&self, rule: RuleRecord) {
        self.data.write().await.rules.push(rule);
    }
}

#[async_trait]
impl PolicyStore for MockPolicyStore {
    async fn classify(
        &mut self,
        host: &DomainLabels,
        client_ip: IpAddr,
    ) -> Result<Vec<CandidateRow>, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::StoreUnavailable("connection refused".to_string()));
        }

        let data = self.data.read().await;
        let mut rows = Vec::new();
        for site in data.sites.iter().filter(|s| s.site.is_ancestor_or_self_of(host)) {
            for rule in data.rules.iter().filter(|r| r.tags.intersects(&site.tags)) {
                if let Some(net) = rule.netmask {
                    if !net.contains(client_ip) {
                        continue;
                    }
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
    pub fn new(store: MockPolicyStore) -> Self {
        Self {
            store,
            created: AtomicU64::new(0),
        }
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}

impl PolicyStoreFactory for MockPolicyStoreFactory {
    fn create(&self) -> Box<dyn PolicyStore> {
        self.created.fetch_add(1, Ordering::Relaxed);
        Box::new(self.store.clone())
    }
}

// ============================================================================
// Mock PolicyRepository
// ============================================================================

#[derive(Default)]
pub struct MockPolicyRepository {
    sites: RwLock<Vec<SiteTagAssignment>>,
    rules: RwLock<Vec<RuleRecord>>,
}

impl MockPolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sites(&self) -> Vec<SiteTagAssignment> {
        self.sites.read().await.clone()
    }

    pub async fn rules(&self) -> Vec<RuleRecord> {
        self.rules.read().await.clone()
    }
}

#[async_trait]
impl PolicyRepository for MockPolicyRepository {
    async fn dump_sites(&self) -> Result<Vec<SiteTagAssignment>, DomainError> {
        Ok(self.sites.read().await.clone())
    }

    async fn load_sites(
        &self,
        rows: Vec<SiteTagAssignment>,
        flush: bool,
    ) -> Result<u64, DomainError> {
        let mut sites = self.sites.write().await;
        if flush {
            sites.clear();
        }
        let mut inserted = 0;
        for row in rows {
            if !sites.contains(&row) {
                sites.push(row);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn dump_rules(&self) -> Result<Vec<RuleRecord>, DomainError> {
        Ok(self.rules.read().await.clone())
    }

    async fn replace_rules(&self, rows: Vec<RuleRecord>) -> Result<u64, DomainError> {
        let count = rows.len() as u64;
        *self.rules.write().await = rows;
        Ok(count)
    }
}
