use crate::ports::PolicyRepository;
use fancy_regex::Regex;
use squid_tagger_domain::{DomainError, RuleRecord, SiteTagAssignment};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: u64,
    /// Rows carrying a path pattern that does not compile. They are still
    /// stored; the matcher skips them at lookup time.
    pub invalid_patterns: u64,
}

pub struct LoadPolicyUseCase {
    repository: Arc<dyn PolicyRepository>,
}

impl LoadPolicyUseCase {
    pub fn new(repository: Arc<dyn PolicyRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn load_sites(
        &self,
        rows: Vec<SiteTagAssignment>,
        flush: bool,
    ) -> Result<LoadReport, DomainError> {
        let mut invalid_patterns = 0;
        for row in &rows {
            if let Some(pattern) = row.regexp.as_deref() {
                if let Err(e) = Regex::new(pattern) {
                    invalid_patterns += 1;
                    warn!(site = %row.site, pattern, error = %e, "Loading a path pattern that does not compile");
                }
            }
        }

        let inserted = self.repository.load_sites(rows, flush).await?;
        info!(inserted, flush, "Site assignments loaded");

        Ok(LoadReport {
            inserted,
            invalid_patterns,
        })
    }

    /// Validate every rule, then replace the rule table. Nothing is written
    /// if any rule is invalid.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn replace_rules(&self, rows: Vec<RuleRecord>) -> Result<LoadReport, DomainError> {
        for (index, rule) in rows.iter().enumerate() {
            rule.validate().map_err(|e| {
                DomainError::InvalidRule(format!("row {}: {e}", index + 1))
            })?;
        }

        let inserted = self.repository.replace_rules(rows).await?;
        info!(inserted, "Rules replaced");

        Ok(LoadReport {
            inserted,
            invalid_patterns: 0,
        })
    }
}
