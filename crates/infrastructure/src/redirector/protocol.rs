use compact_str::CompactString;
use squid_tagger_domain::{Decision, Request, RequestId, ResponseFormat};
use std::net::IpAddr;
use std::sync::Arc;

/// One framed input line.
#[derive(Debug, Clone)]
pub enum Frame {
    Request(Request),
    /// The line as received; it is echoed back unchanged.
    Malformed(String),
}

/// Parse one request line:
///
/// `<id> [<scheme>://]<host>[:<port>][/<path>] <client-ip>[/<fqdn>|/-] <ident>|- <method>|-`
///
/// Fields after the method are ignored.
pub fn parse_line(line: &str) -> Frame {
    match parse_request(line) {
        Some(request) => Frame::Request(request),
        None => Frame::Malformed(line.to_string()),
    }
}

fn parse_request(line: &str) -> Option<Request> {
    let mut fields = line.split_ascii_whitespace();
    let id = RequestId::parse(fields.next()?)?;
    let url = parse_url(fields.next()?)?;
    let (client_ip, client_fqdn) = parse_client(fields.next()?)?;
    let ident = optional(fields.next()?).map(Arc::from);
    let method = match optional(fields.next()?) {
        Some(m) if m.bytes().all(|b| b.is_ascii_alphabetic()) => Some(CompactString::new(m)),
        Some(_) => return None,
        None => None,
    };

    let mut request = Request::new(id, url.host, url.path, client_ip);
    request.scheme = url.scheme.map(CompactString::new);
    request.port = url.port;
    request.client_fqdn = client_fqdn.map(Arc::from);
    request.ident = ident;
    request.method = method;
    Some(request)
}

struct UrlParts<'a> {
    scheme: Option<&'a str>,
    host: &'a str,
    port: Option<u16>,
    path: &'a str,
}

fn parse_url(raw: &str) -> Option<UrlParts<'_>> {
    let (scheme, rest) = match raw.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => (Some(scheme), rest),
        _ => (None, raw),
    };

    let host_len = if rest.starts_with('[') {
        let close = rest.find(']')?;
        let inner = &rest[1..close];
        if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_hexdigit() || b == b':' || b == b'.') {
            return None;
        }
        close + 1
    } else {
        rest.bytes()
            .take_while(|&b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
            .count()
    };
    if host_len == 0 {
        return None;
    }
    let (host, rest) = rest.split_at(host_len);

    let (port, path) = match rest.strip_prefix(':') {
        Some(after) => {
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let (port, path) = after.split_at(digits);
            (Some(port.parse::<u16>().ok()?), path)
        }
        None => (None, rest),
    };

    let path = match path {
        "" => "/",
        p if p.starts_with('/') => p,
        _ => return None,
    };

    Some(UrlParts {
        scheme,
        host,
        port,
        path,
    })
}

fn is_scheme(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

fn parse_client(raw: &str) -> Option<(IpAddr, Option<&str>)> {
    let (ip, fqdn) = match raw.split_once('/') {
        Some((ip, fqdn)) if !fqdn.is_empty() => (ip, optional(fqdn)),
        Some(_) => return None,
        None => (raw, None),
    };
    Some((ip.parse().ok()?, fqdn))
}

fn optional(field: &str) -> Option<&str> {
    (field != "-").then_some(field)
}

/// Renders reply lines: `<id> <result>`, without the terminator.
#[derive(Debug, Clone, Copy)]
pub struct ReplyFormatter {
    format: ResponseFormat,
    status: u16,
}

impl ReplyFormatter {
    pub fn new(format: ResponseFormat, status: u16) -> Self {
        Self { format, status }
    }

    pub fn format(&self, id: &RequestId, decision: &Decision) -> String {
        format!("{} {}", id, decision.to_wire(self.format, self.status))
    }
}
