use super::{is_connectivity_error, map_sqlx_error};
use async_trait::async_trait;
use chrono::NaiveTime;
use squid_tagger_application::ports::{PolicyStore, PolicyStoreFactory};
use squid_tagger_domain::{CandidateRow, DomainError, DomainLabels, ScheduleWindow};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

/// Every (site, rule) pair whose site is an ancestor-or-self of the host,
/// whose tags overlap and whose network contains the client. Most specific
/// site first; ties keep insertion order.
const CLASSIFY_SQL: &str = "
    SELECT array_length(u.site, 1) AS depth,
           r.redirect_url,
           u.regexp,
           r.from_weekday,
           r.to_weekday,
           r.from_time,
           r.to_time
    FROM urls u
    JOIN rules r ON r.tag && u.tag
    WHERE u.site <@ $1::text[]
      AND u.site = ($1::text[])[1:array_length(u.site, 1)]
      AND (r.netmask IS NULL OR r.netmask >>= $2::text::inet)
    ORDER BY array_length(u.site, 1) DESC, (u.regexp IS NULL), u.id, r.id";

type CandidateTuple = (
    Option<i32>,
    String,
    Option<String>,
    Option<i16>,
    Option<i16>,
    Option<NaiveTime>,
    Option<NaiveTime>,
);

/// One worker's session with the policy store.
///
/// The connection is opened on first use. After a connectivity failure it is
/// dropped and the query is retried once on a new connection, unless the
/// failing connection was itself brand new.
pub struct PgPolicyStore {
    options: PgConnectOptions,
    query_timeout: Duration,
    conn: Option<PgConnection>,
}

impl PgPolicyStore {
    pub fn new(options: PgConnectOptions, query_timeout: Duration) -> Self {
        Self {
            options,
            query_timeout,
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connection(&mut self) -> Result<&mut PgConnection, DomainError> {
        if self.conn.is_none() {
            let connect = PgConnection::connect_with(&self.options);
            let conn = match timeout(self.query_timeout, connect).await {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    error!(error = %e, "Cannot connect to policy store");
                    return Err(DomainError::StoreUnavailable(e.to_string()));
                }
                Err(_) => {
                    error!(
                        timeout_ms = self.query_timeout.as_millis() as u64,
                        "Policy store connect timed out"
                    );
                    return Err(DomainError::QueryTimeout);
                }
            };
            debug!("Policy store connection opened");
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| DomainError::StoreUnavailable("no connection".to_string()))
    }

    fn row_to_candidate(row: CandidateTuple) -> Result<CandidateRow, DomainError> {
        let (depth, redirect_url, regexp, from_weekday, to_weekday, from_time, to_time) = row;

        let depth = usize::try_from(depth.unwrap_or(0)).unwrap_or(0);
        let mut candidate = CandidateRow::new(depth, &redirect_url);
        if let Some(regexp) = regexp.as_deref().filter(|r| !r.is_empty()) {
            candidate = candidate.with_regexp(regexp);
        }
        if let Some(window) =
            ScheduleWindow::from_columns(from_weekday, to_weekday, from_time, to_time)?
        {
            candidate = candidate.with_schedule(window);
        }
        Ok(candidate)
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    #[instrument(skip(self, host), fields(host = %host))]
    async fn classify(
        &mut self,
        host: &DomainLabels,
        client_ip: IpAddr,
    ) -> Result<Vec<CandidateRow>, DomainError> {
        let labels = host.to_vec();
        let client = client_ip.to_string();
        let query_timeout = self.query_timeout;

        loop {
            let fresh = self.conn.is_none();
            let conn = self.connection().await?;

            let query = sqlx::query_as::<_, CandidateTuple>(CLASSIFY_SQL)
                .bind(&labels)
                .bind(&client)
                .fetch_all(conn);

            match timeout(query_timeout, query).await {
                Ok(Ok(rows)) => {
                    debug!(rows = rows.len(), "Candidate rows fetched");
                    return rows.into_iter().map(Self::row_to_candidate).collect();
                }
                Ok(Err(e)) if is_connectivity_error(&e) => {
                    self.conn = None;
                    if fresh {
                        error!(error = %e, "Policy store query failed on a new connection");
                        return Err(map_sqlx_error(e));
                    }
                    warn!(error = %e, "Policy store connection lost; reconnecting");
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Policy store query failed");
                    return Err(map_sqlx_error(e));
                }
                Err(_) => {
                    // The session may still be busy with the abandoned query.
                    self.conn = None;
                    error!(
                        timeout_ms = query_timeout.as_millis() as u64,
                        "Policy store query timed out"
                    );
                    return Err(DomainError::QueryTimeout);
                }
            }
        }
    }
}

/// Hands every worker its own [`PgPolicyStore`].
pub struct PgPolicyStoreFactory {
    options: PgConnectOptions,
    query_timeout: Duration,
}

impl PgPolicyStoreFactory {
    pub fn new(options: PgConnectOptions, query_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            options,
            query_timeout,
        })
    }
}

impl PolicyStoreFactory for PgPolicyStoreFactory {
    fn create(&self) -> Box<dyn PolicyStore> {
        Box::new(PgPolicyStore::new(self.options.clone(), self.query_timeout))
    }
}
