mod policy_repository;
mod policy_store;

pub use policy_repository::PolicyRepository;
pub use policy_store::{PolicyStore, PolicyStoreFactory};
