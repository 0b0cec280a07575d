use crate::{DomainError, DomainLabels};
use compact_str::CompactString;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Caller-assigned request id, echoed back exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(CompactString);

impl RequestId {
    /// Accepts a non-empty run of ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(CompactString::new(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One classification job read from the redirector pipe.
///
/// Only `host`, `path` and `client_ip` take part in matching; the other
/// fields are kept for logging.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: RequestId,
    pub scheme: Option<CompactString>,
    pub host: Arc<str>,
    pub port: Option<u16>,
    /// Always starts with `/`; a URL without a path has path `/`.
    pub path: Arc<str>,
    pub client_ip: IpAddr,
    pub client_fqdn: Option<Arc<str>>,
    pub ident: Option<Arc<str>>,
    pub method: Option<CompactString>,
}

impl Request {
    pub fn new(id: RequestId, host: impl Into<Arc<str>>, path: &str, client_ip: IpAddr) -> Self {
        let path: Arc<str> = if path.starts_with('/') {
            Arc::from(path)
        } else {
            Arc::from(format!("/{path}").as_str())
        };

        Self {
            id,
            scheme: None,
            host: host.into(),
            port: None,
            path,
            client_ip,
            client_fqdn: None,
            ident: None,
            method: None,
        }
    }

    pub fn labels(&self) -> Result<DomainLabels, DomainError> {
        DomainLabels::parse(&self.host)
    }

    /// Path without its leading slash, the value substituted for `{path}`.
    pub fn path_tail(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}
