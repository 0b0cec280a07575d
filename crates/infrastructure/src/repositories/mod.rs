pub mod policy_repository;
pub mod policy_store;

pub use policy_repository::PgPolicyRepository;
pub use policy_store::{PgPolicyStore, PgPolicyStoreFactory};

use squid_tagger_domain::DomainError;

/// Errors after which the connection cannot be trusted for another query.
pub(crate) fn is_connectivity_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        // class 08: connection exception, 57P: operator intervention
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code.starts_with("57P")),
        _ => false,
    }
}

pub(crate) fn map_sqlx_error(e: sqlx::Error) -> DomainError {
    if is_connectivity_error(&e) {
        DomainError::StoreUnavailable(e.to_string())
    } else {
        DomainError::DatabaseError(e.to_string())
    }
}
