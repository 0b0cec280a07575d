//! squid-tagger domain layer
pub mod config;
pub mod decision;
pub mod domain_labels;
pub mod errors;
pub mod policy;
pub mod request;
pub mod schedule;

pub use config::{CliOverrides, Config, ConfigError, ResponseFormat};
pub use decision::Decision;
pub use domain_labels::DomainLabels;
pub use errors::DomainError;
pub use policy::{parse_netmask, CandidateRow, RuleRecord, SiteTagAssignment, TagSet};
pub use request::{Request, RequestId};
pub use schedule::ScheduleWindow;
