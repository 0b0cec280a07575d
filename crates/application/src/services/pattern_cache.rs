use dashmap::DashMap;
use fancy_regex::Regex;
use rustc_hash::FxBuildHasher;
use squid_tagger_domain::DomainError;
use std::sync::Arc;
use tracing::warn;

type CompiledPattern = Result<Arc<Regex>, DomainError>;

/// Compiled path patterns keyed by their source text.
///
/// Shared by all workers. A pattern is compiled at most once per distinct
/// source in the common case; two workers racing on first use may both
/// compile it and the last insert wins, which is harmless. Failed compiles
/// are remembered too so a broken stored pattern is reported once.
pub struct PatternCache {
    inner: DashMap<Arc<str>, CompiledPattern, FxBuildHasher>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self {
            inner: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn get_or_compile(&self, source: &str) -> CompiledPattern {
        if let Some(entry) = self.inner.get(source) {
            return entry.value().clone();
        }

        let compiled = Regex::new(source).map(Arc::new).map_err(|e| {
            warn!(pattern = source, error = %e, "Cannot compile stored path pattern; rows using it never match");
            DomainError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            }
        });

        self.inner.insert(Arc::from(source), compiled.clone());
        compiled
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}
