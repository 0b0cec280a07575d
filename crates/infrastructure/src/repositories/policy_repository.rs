use super::map_sqlx_error;
use async_trait::async_trait;
use chrono::NaiveTime;
use squid_tagger_application::ports::PolicyRepository;
use squid_tagger_domain::{
    parse_netmask, DomainError, DomainLabels, RuleRecord, SiteTagAssignment, TagSet,
};
use sqlx::PgPool;
use tracing::{error, instrument};

type SiteRow = (Vec<String>, Vec<String>, Option<String>);

type RuleRow = (
    Option<String>,
    String,
    Option<i16>,
    Option<i16>,
    Option<NaiveTime>,
    Option<NaiveTime>,
    Vec<String>,
);

/// Bulk access to the `urls` and `rules` tables. Every load runs in one
/// transaction.
pub struct PgPolicyRepository {
    pool: PgPool,
}

impl PgPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_site(row: SiteRow) -> Result<SiteTagAssignment, DomainError> {
        let (site, tags, regexp) = row;
        Ok(SiteTagAssignment::new(
            DomainLabels::from_labels(site)?,
            TagSet::new(tags)?,
            regexp,
        ))
    }

    fn row_to_rule(row: RuleRow) -> Result<RuleRecord, DomainError> {
        let (netmask, redirect_url, from_weekday, to_weekday, from_time, to_time, tags) = row;
        Ok(RuleRecord {
            netmask: match netmask {
                Some(raw) => parse_netmask(&raw)?,
                None => None,
            },
            redirect_url,
            from_weekday,
            to_weekday,
            from_time,
            to_time,
            tags: TagSet::new(tags)?,
        })
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        error!(error = %e, "{}", context);
        map_sqlx_error(e)
    }
}

#[async_trait]
impl PolicyRepository for PgPolicyRepository {
    #[instrument(skip(self))]
    async fn dump_sites(&self) -> Result<Vec<SiteTagAssignment>, DomainError> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT site, tag, regexp FROM urls
             ORDER BY site, tag, regexp NULLS FIRST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to dump site assignments"))?;

        rows.into_iter().map(Self::row_to_site).collect()
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn load_sites(
        &self,
        rows: Vec<SiteTagAssignment>,
        flush: bool,
    ) -> Result<u64, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin load transaction"))?;

        if flush {
            sqlx::query("DELETE FROM urls")
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to flush site assignments"))?;
        }

        let mut inserted = 0;
        for row in &rows {
            let result = sqlx::query(
                "INSERT INTO urls (site, tag, regexp) VALUES ($1, $2, NULLIF($3, ''))
                 ON CONFLICT DO NOTHING",
            )
            .bind(row.site.to_vec())
            .bind(row.tags.to_vec())
            .bind(row.regexp.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert site assignment"))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit site assignments"))?;

        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn dump_rules(&self) -> Result<Vec<RuleRecord>, DomainError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT netmask::text, redirect_url, from_weekday, to_weekday, from_time, to_time, tag
             FROM rules
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to dump rules"))?;

        rows.into_iter().map(Self::row_to_rule).collect()
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn replace_rules(&self, rows: Vec<RuleRecord>) -> Result<u64, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin rule transaction"))?;

        sqlx::query("DELETE FROM rules")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to clear rules"))?;

        let mut inserted = 0;
        for rule in &rows {
            let result = sqlx::query(
                "INSERT INTO rules (netmask, redirect_url, from_weekday, to_weekday, from_time, to_time, tag)
                 VALUES ($1::text::cidr, $2, $3, $4, $5, $6, $7)",
            )
            .bind(rule.netmask.map(|n| n.to_string()))
            .bind(&rule.redirect_url)
            .bind(rule.from_weekday)
            .bind(rule.to_weekday)
            .bind(rule.from_time)
            .bind(rule.to_time)
            .bind(rule.tags.to_vec())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert rule"))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit rules"))?;

        Ok(inserted)
    }
}
