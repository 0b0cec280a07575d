use crate::{DomainError, DomainLabels, ScheduleWindow};
use chrono::NaiveTime;
use compact_str::CompactString;
use ipnetwork::IpNetwork;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Set of category tags, written as a brace-delimited literal: `{ads,tracking}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagSet(Vec<CompactString>);

impl TagSet {
    pub fn new<I, S>(tags: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: Vec<CompactString> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            validate_tag(tag)?;
            if !set.iter().any(|t| t == tag) {
                set.push(CompactString::new(tag));
            }
        }

        if set.is_empty() {
            return Err(DomainError::InvalidTagSet("tag set is empty".to_string()));
        }

        Ok(Self(set))
    }

    pub fn tags(&self) -> &[CompactString] {
        &self.0
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn intersects(&self, other: &TagSet) -> bool {
        self.0.iter().any(|t| other.contains(t))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().map(|t| t.to_string()).collect()
    }
}

fn validate_tag(tag: &str) -> Result<(), DomainError> {
    if tag.is_empty() {
        return Err(DomainError::InvalidTagSet("empty tag name".to_string()));
    }
    if tag.chars().any(|c| matches!(c, '{' | '}' | ',' | '"') || c.is_whitespace()) {
        return Err(DomainError::InvalidTagSet(format!(
            "tag '{tag}' contains a reserved character"
        )));
    }
    Ok(())
}

impl FromStr for TagSet {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| DomainError::InvalidTagSet(format!("'{s}' is not a {{...}} literal")))?;

        Self::new(inner.split(','))
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(tag)?;
        }
        f.write_str("}")
    }
}

/// A site row: the domain subtree it covers, its tags and an optional path
/// pattern restricting it to part of the URL space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTagAssignment {
    pub site: DomainLabels,
    pub tags: TagSet,
    pub regexp: Option<String>,
}

impl SiteTagAssignment {
    pub fn new(site: DomainLabels, tags: TagSet, regexp: Option<String>) -> Self {
        Self {
            site,
            tags,
            regexp: regexp.filter(|r| !r.is_empty()),
        }
    }
}

/// A rule row as stored and exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    pub netmask: Option<IpNetwork>,
    pub redirect_url: String,
    pub from_weekday: Option<i16>,
    pub to_weekday: Option<i16>,
    pub from_time: Option<NaiveTime>,
    pub to_time: Option<NaiveTime>,
    pub tags: TagSet,
}

impl RuleRecord {
    pub fn unconditional(redirect_url: impl Into<String>, tags: TagSet) -> Self {
        Self {
            netmask: None,
            redirect_url: redirect_url.into(),
            from_weekday: None,
            to_weekday: None,
            from_time: None,
            to_time: None,
            tags,
        }
    }

    pub fn schedule(&self) -> Result<Option<ScheduleWindow>, DomainError> {
        ScheduleWindow::from_columns(self.from_weekday, self.to_weekday, self.from_time, self.to_time)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.redirect_url.trim().is_empty() {
            return Err(DomainError::InvalidRule(
                "redirect_url cannot be empty".to_string(),
            ));
        }
        self.schedule().map(|_| ())
    }
}

pub fn parse_netmask(raw: &str) -> Result<Option<IpNetwork>, DomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<IpNetwork>()
        .map(Some)
        .map_err(|e| DomainError::InvalidCidr(format!("{raw}: {e}")))
}

/// One row returned by the classification query, already joined with its
/// rule and restricted to the client network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    /// Number of labels of the matched site; higher is more specific.
    pub site_depth: usize,
    pub redirect_url: Arc<str>,
    pub regexp: Option<Arc<str>>,
    pub schedule: Option<ScheduleWindow>,
}

impl CandidateRow {
    pub fn new(site_depth: usize, redirect_url: &str) -> Self {
        Self {
            site_depth,
            redirect_url: Arc::from(redirect_url),
            regexp: None,
            schedule: None,
        }
    }

    pub fn with_regexp(mut self, regexp: &str) -> Self {
        self.regexp = Some(Arc::from(regexp));
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleWindow) -> Self {
        self.schedule = Some(schedule);
        self
    }
}
