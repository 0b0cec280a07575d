use crate::DomainError;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// A host name stored root-to-leaf: `www.example.com` → `[com, example, www]`.
///
/// This is the join key of the policy store. A site stored as `[com, example]`
/// covers `example.com` and every subdomain because its labels are a prefix
/// of theirs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainLabels(SmallVec<[CompactString; 6]>);

impl DomainLabels {
    /// Parse a host name as it appears in a URL.
    ///
    /// The name is lower-cased and a single trailing dot is dropped. A
    /// bracketed IPv6 literal is kept as one label.
    pub fn parse(host: &str) -> Result<Self, DomainError> {
        let trimmed = host.strip_suffix('.').unwrap_or(host);
        if trimmed.is_empty() {
            return Err(DomainError::InvalidDomainName(host.to_string()));
        }

        if trimmed.starts_with('[') {
            if !trimmed.ends_with(']') {
                return Err(DomainError::InvalidDomainName(host.to_string()));
            }
            let mut labels = SmallVec::new();
            labels.push(CompactString::new(trimmed.to_ascii_lowercase()));
            return Ok(Self(labels));
        }

        let mut labels: SmallVec<[CompactString; 6]> = SmallVec::new();
        for label in trimmed.split('.').rev() {
            if label.is_empty() || label.chars().any(|c| c.is_whitespace()) {
                return Err(DomainError::InvalidDomainName(host.to_string()));
            }
            labels.push(CompactString::new(label.to_ascii_lowercase()));
        }

        Ok(Self(labels))
    }

    /// Build from labels that are already ordered root-to-leaf, e.g. a
    /// `text[]` column read back from the store.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: SmallVec<[CompactString; 6]> = labels
            .into_iter()
            .map(|l| CompactString::new(l.as_ref()))
            .collect();

        if labels.is_empty() || labels.iter().any(|l| l.is_empty()) {
            return Err(DomainError::InvalidDomainName(
                labels.iter().rev().map(|l| l.as_str()).collect::<Vec<_>>().join("."),
            ));
        }

        Ok(Self(labels))
    }

    pub fn labels(&self) -> &[CompactString] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `[com, example]` is an ancestor of `[com, example, www]` and of itself.
    #[inline]
    pub fn is_ancestor_or_self_of(&self, other: &DomainLabels) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Owned root-to-leaf labels, the shape bound to `text[]` parameters.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().map(|l| l.to_string()).collect()
    }
}

impl fmt::Display for DomainLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for label in self.0.iter().rev() {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(label)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for DomainLabels {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
