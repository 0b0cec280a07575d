mod pattern_cache;
mod rule_matcher;

pub use pattern_cache::PatternCache;
pub use rule_matcher::{resolve_template, MatchContext, RuleMatcher};
