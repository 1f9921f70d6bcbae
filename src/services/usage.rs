//! Usage service: fire-and-forget ledger writes from the gateway plus
//! the read-only aggregates (summary, timeline, onboarding funnel)
//! recomputed from the ledger.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;
use r2d2::ManageConnection;

use super::types::ServiceFuture;
use models::*;
use repos::repo_factory::ReposFactory;
use services::Service;

/// Days of ledger history feeding the summary aggregate
const SUMMARY_WINDOW_DAYS: i64 = 30;
/// Hours of ledger history feeding the timeline aggregate
const TIMELINE_WINDOW_HOURS: i64 = 24;

/// Process-local counters for the parts of usage recording that must
/// never fail the request path
#[derive(Debug, Default)]
pub struct UsageMetrics {
    pub dropped_records: AtomicU64,
}

pub trait UsageService {
    /// Appends a ledger row off the request path. The caller's request
    /// never waits for, or fails because of, this write; a failed write
    /// is counted and logged.
    fn record_detached(&self, record: NewUsageRecord);

    /// The tenant's per endpoint/outcome aggregate
    fn summary(&self, tenant: TenantId) -> ServiceFuture<Vec<UsageSummaryRow>>;

    /// The tenant's hourly call/error counts
    fn timeline(&self, tenant: TenantId) -> ServiceFuture<Vec<UsageTimelineRow>>;

    /// Merchant counts per onboarding stage, employee portal view
    fn funnel(&self) -> ServiceFuture<FunnelReport>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > UsageService for Service<T, M, F>
{
    fn record_detached(&self, record: NewUsageRecord) {
        let db_pool = self.static_context.db_pool.clone();
        let repo_factory = self.static_context.repo_factory.clone();
        let metrics = self.static_context.usage_metrics.clone();

        self.static_context
            .cpu_pool
            .spawn_fn(move || {
                db_pool
                    .get()
                    .map_err(FailureError::from)
                    .and_then(|conn| {
                        let usage_records_repo = repo_factory.create_usage_records_repo_with_sys_acl(&*conn);
                        usage_records_repo.create(record).map(|_| ())
                    })
                    .map_err(move |e| {
                        metrics.dropped_records.fetch_add(1, Ordering::Relaxed);
                        warn!("Dropped usage record: {}", e);
                    })
            })
            .forget();
    }

    fn summary(&self, tenant: TenantId) -> ServiceFuture<Vec<UsageSummaryRow>> {
        debug!("Usage summary for tenant {}", tenant);
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let usage_records_repo = repo_factory.create_usage_records_repo_with_sys_acl(&*conn);
            let since = Utc::now().naive_utc() - Duration::days(SUMMARY_WINDOW_DAYS);
            usage_records_repo
                .summary_for_tenant(tenant, since)
                .map_err(|e: FailureError| e.context("Service usage, summary endpoint error occured.").into())
        })
    }

    fn timeline(&self, tenant: TenantId) -> ServiceFuture<Vec<UsageTimelineRow>> {
        debug!("Usage timeline for tenant {}", tenant);
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let usage_records_repo = repo_factory.create_usage_records_repo_with_sys_acl(&*conn);
            let since = Utc::now().naive_utc() - Duration::hours(TIMELINE_WINDOW_HOURS);
            usage_records_repo
                .timeline_for_tenant(tenant, since)
                .map_err(|e: FailureError| e.context("Service usage, timeline endpoint error occured.").into())
        })
    }

    fn funnel(&self) -> ServiceFuture<FunnelReport> {
        debug!("Onboarding funnel");
        let current_uid = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo(&*conn, current_uid);
            merchants_repo
                .funnel()
                .map(|stages| FunnelReport { stages })
                .map_err(|e: FailureError| e.context("Service usage, funnel endpoint error occured.").into())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use futures::Future;

    use client::psp::mock::MockPspVerifier;
    use models::*;
    use repos::repo_factory::tests::*;
    use repos::repo_factory::ReposFactory;
    use repos::UsageRecordsRepo;

    fn tenant() -> TenantId {
        TenantId::Merchant(MerchantId::new())
    }

    #[test]
    fn summary_groups_by_endpoint_and_outcome() {
        let repo_factory = ReposFactoryMock::default();
        let conn = MockConnection::default();
        let repo = repo_factory.create_usage_records_repo_with_sys_acl(&conn);
        let tenant = tenant();

        repo.create(NewUsageRecord::success(&tenant, "authorize", 12)).unwrap();
        repo.create(NewUsageRecord::success(&tenant, "authorize", 18)).unwrap();
        repo.create(NewUsageRecord::error(Some(&tenant), "authorize", "rate_limit_exceeded", 1)).unwrap();
        repo.create(NewUsageRecord::success(&tenant, "usage.summary", 30)).unwrap();

        let since = Utc::now().naive_utc() - Duration::hours(1);
        let rows = repo.summary_for_tenant(tenant, since).unwrap();

        assert_eq!(rows.len(), 3);
        let authorize_ok = rows
            .iter()
            .find(|row| row.endpoint == "authorize" && row.outcome == "success")
            .unwrap();
        assert_eq!(authorize_ok.calls, 2);
        assert_eq!(authorize_ok.avg_latency_ms as i64, 15);
    }

    #[test]
    fn summary_never_mixes_tenants() {
        let repo_factory = ReposFactoryMock::default();
        let conn = MockConnection::default();
        let repo = repo_factory.create_usage_records_repo_with_sys_acl(&conn);
        let first = tenant();
        let second = tenant();

        repo.create(NewUsageRecord::success(&first, "authorize", 10)).unwrap();
        repo.create(NewUsageRecord::success(&second, "authorize", 10)).unwrap();

        let since = Utc::now().naive_utc() - Duration::hours(1);
        let rows = repo.summary_for_tenant(first, since).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].calls, 1);
    }

    #[test]
    fn funnel_counts_merchants_per_stage() {
        use services::{OnboardingService, UsageService};

        let repo_factory = ReposFactoryMock::default();
        let service = create_service(repo_factory, Arc::new(MockPspVerifier::default()), Some(UserId(1)), None);

        for _ in 0..2 {
            service
                .submit_registration(NewMerchantPayload {
                    legal_name: "Acme Inc".to_string(),
                    contact_email: "ops@acme.example".to_string(),
                    country: "US".to_string(),
                    monthly_volume: ::bigdecimal::BigDecimal::from(1_000),
                })
                .wait()
                .unwrap();
        }

        let report = service.funnel().wait().unwrap();
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].status, "pending_documents");
        assert_eq!(report.stages[0].merchants, 2);
    }
}
