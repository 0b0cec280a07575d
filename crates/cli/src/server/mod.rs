pub mod redirector;

pub use redirector::{run_redirector, StopReason};
