mod dump_policy;
mod load_policy;

pub use dump_policy::DumpPolicyUseCase;
pub use load_policy::{LoadPolicyUseCase, LoadReport};
