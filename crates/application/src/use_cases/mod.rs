pub mod classify;
pub mod policy;

// Re-export use cases
pub use classify::ClassifyRequestUseCase;
pub use policy::{DumpPolicyUseCase, LoadPolicyUseCase, LoadReport};
