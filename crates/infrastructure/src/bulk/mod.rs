//! CSV interchange for the policy tables and the SquidGuard converter.
pub mod csv_codec;
pub mod squidguard;

pub use csv_codec::{read_rules, read_sites, write_rules, write_sites, RULE_HEADER, SITE_HEADER};
pub use squidguard::{convert_directory, write_csv, SquidGuardEntry};
