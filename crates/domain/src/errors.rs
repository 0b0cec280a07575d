use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Invalid tag set: {0}")]
    InvalidTagSet(String),

    #[error("Invalid schedule window: {0}")]
    InvalidSchedule(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Policy store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("CSV header must be {expected:?}, found {found:?}")]
    InvalidCsvHeader { expected: String, found: String },

    #[error("Request queue closed")]
    QueueClosed,
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
