use super::PatternCache;
use chrono::NaiveDateTime;
use squid_tagger_domain::{CandidateRow, Decision};
use std::sync::Arc;
use tracing::{debug, warn};

/// Request facts the matcher looks at.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Host as received, substituted for `{host}`
    pub host: &'a str,
    /// Full path including the leading `/`, tested against row patterns
    pub path: &'a str,
    /// Local wall-clock time the decision is made at
    pub now: NaiveDateTime,
}

/// Turns the ordered candidate rows of one request into a decision.
///
/// Rows arrive most specific site first and are scanned once, in order:
/// 1. a row whose schedule window does not contain `now` is skipped;
/// 2. a row without a path pattern matches;
/// 3. a row with a pattern matches when the pattern finds a match anywhere
///    in the path (patterns carry their own anchors); a pattern that does
///    not compile never matches.
///
/// The first matching row wins. No match means PASS.
pub struct RuleMatcher {
    patterns: Arc<PatternCache>,
}

impl RuleMatcher {
    pub fn new(patterns: Arc<PatternCache>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    pub fn decide(&self, rows: &[CandidateRow], ctx: &MatchContext<'_>) -> Decision {
        for row in rows {
            if let Some(window) = row.schedule {
                if !window.contains(ctx.now) {
                    continue;
                }
            }

            if let Some(source) = row.regexp.as_deref() {
                if !self.path_matches(source, ctx.path) {
                    continue;
                }
            }

            debug!(
                site_depth = row.site_depth,
                template = %row.redirect_url,
                "Candidate row matched"
            );
            return Decision::Redirect(resolve_template(&row.redirect_url, ctx.host, ctx.path));
        }

        Decision::Pass
    }

    fn path_matches(&self, source: &str, path: &str) -> bool {
        let Ok(pattern) = self.patterns.get_or_compile(source) else {
            return false;
        };

        match pattern.is_match(path) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(pattern = source, path, error = %e, "Path pattern failed at match time; skipping row");
                false
            }
        }
    }
}

/// Substitute `{path}` (request path without its leading `/`) and `{host}`
/// in a redirect template.
///
/// Substitution is literal and single-pass: text inserted for one
/// placeholder is never scanned again, and any other `{...}` is copied
/// verbatim.
pub fn resolve_template(template: &str, host: &str, path: &str) -> String {
    let path_tail = path.strip_prefix('/').unwrap_or(path);
    let mut out = String::with_capacity(template.len() + host.len() + path_tail.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        if let Some(after) = candidate.strip_prefix("{path}") {
            out.push_str(path_tail);
            rest = after;
        } else if let Some(after) = candidate.strip_prefix("{host}") {
            out.push_str(host);
            rest = after;
        } else {
            out.push('{');
            rest = &candidate[1..];
        }
    }

    out.push_str(rest);
    out
}
