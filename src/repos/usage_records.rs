//! Repo for the usage_records ledger. Insert-only by construction: no
//! update or delete is exposed, aggregates are plain selects over the
//! ledger.

use chrono::NaiveDateTime;
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::query_dsl::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{Timestamp, VarChar};
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use repos::legacy_acl::*;

use super::acl;
use super::types::RepoResult;
use models::authorization::*;
use models::{NewUsageRecord, TenantId, UsageRecord, UsageSummaryRow, UsageTimelineRow, UserId};
use schema::usage_records::dsl::*;

pub trait UsageRecordsRepo {
    /// Append one row to the ledger
    fn create(&self, payload: NewUsageRecord) -> RepoResult<UsageRecord>;

    /// Per endpoint/outcome aggregate for a tenant since a point in time
    fn summary_for_tenant(&self, tenant: TenantId, since: NaiveDateTime) -> RepoResult<Vec<UsageSummaryRow>>;

    /// Hourly call/error counts for a tenant since a point in time
    fn timeline_for_tenant(&self, tenant: TenantId, since: NaiveDateTime) -> RepoResult<Vec<UsageTimelineRow>>;
}

pub struct UsageRecordsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, UsageRecord>>,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> UsageRecordsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<Acl<Resource, Action, Scope, FailureError, UsageRecord>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> UsageRecordsRepo
    for UsageRecordsRepoImpl<'a, T>
{
    fn create(&self, payload: NewUsageRecord) -> RepoResult<UsageRecord> {
        debug!("Append usage record {} to the ledger.", payload);
        let query = diesel::insert_into(usage_records).values(&payload);
        query
            .get_result(self.db_conn)
            .map_err(From::from)
            .and_then(|record| {
                acl::check(&*self.acl, Resource::UsageRecord, Action::Write, self, Some(&record))?;
                Ok(record)
            })
            .map_err(|e: FailureError| e.context(format!("Append usage record {} error occured", payload)).into())
    }

    fn summary_for_tenant(&self, tenant: TenantId, since: NaiveDateTime) -> RepoResult<Vec<UsageSummaryRow>> {
        debug!("Usage summary of tenant {} from the ledger.", tenant);
        sql_query(
            "
            SELECT endpoint, outcome, COUNT(*) AS calls,
                   COALESCE(AVG(latency_ms), 0)::float8 AS avg_latency_ms
            FROM usage_records
            WHERE tenant_id = $1 AND created_at >= $2
            GROUP BY endpoint, outcome
            ORDER BY endpoint, outcome
        ",
        )
        .bind::<VarChar, _>(tenant.to_string())
        .bind::<Timestamp, _>(since)
        .get_results::<UsageSummaryRow>(self.db_conn)
        .map_err(|e| {
            FailureError::from(e)
                .context(format!("Usage summary of tenant {} error occured", tenant))
                .into()
        })
    }

    fn timeline_for_tenant(&self, tenant: TenantId, since: NaiveDateTime) -> RepoResult<Vec<UsageTimelineRow>> {
        debug!("Usage timeline of tenant {} from the ledger.", tenant);
        sql_query(
            "
            SELECT date_trunc('hour', created_at) AS bucket,
                   COUNT(*) AS calls,
                   COUNT(*) FILTER (WHERE outcome = 'error') AS errors
            FROM usage_records
            WHERE tenant_id = $1 AND created_at >= $2
            GROUP BY bucket
            ORDER BY bucket
        ",
        )
        .bind::<VarChar, _>(tenant.to_string())
        .bind::<Timestamp, _>(since)
        .get_results::<UsageTimelineRow>(self.db_conn)
        .map_err(|e| {
            FailureError::from(e)
                .context(format!("Usage timeline of tenant {} error occured", tenant))
                .into()
        })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, UsageRecord>
    for UsageRecordsRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&UsageRecord>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}
