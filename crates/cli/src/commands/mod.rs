pub mod bulk;

pub use bulk::{dump_rules, dump_sites, import_squidguard, load_rules, load_sites};
