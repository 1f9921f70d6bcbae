use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use std::sync::Arc;

use models::*;
use repos::legacy_acl::{Acl, SystemACL, UnauthorizedACL};
use repos::*;

pub trait ReposFactory<C>: Clone + Send + Sync + 'static
where
    C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
{
    fn create_merchants_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<MerchantsRepo + 'a>;
    fn create_merchants_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<MerchantsRepo + 'a>;
    fn create_merchant_documents_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<MerchantDocumentsRepo + 'a>;
    fn create_agents_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<AgentsRepo + 'a>;
    fn create_api_keys_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<ApiKeysRepo + 'a>;
    fn create_usage_records_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UsageRecordsRepo + 'a>;
    fn create_user_roles_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<UserRolesRepo + 'a>;
    fn create_user_roles_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UserRolesRepo + 'a>;
}

#[derive(Clone)]
pub struct ReposFactoryImpl {
    roles_cache: Arc<RolesCacheImpl>,
}

impl ReposFactoryImpl {
    pub fn new(roles_cache: RolesCacheImpl) -> Self {
        Self {
            roles_cache: Arc::new(roles_cache),
        }
    }

    pub fn get_roles<'a, C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
        &self,
        id: UserId,
        db_conn: &'a C,
    ) -> Vec<Role> {
        if self.roles_cache.contains(id) {
            self.roles_cache.get(id)
        } else {
            let roles = self
                .create_user_roles_repo_with_sys_acl(db_conn)
                .list_for_user(id)
                .ok()
                .unwrap_or_default();
            self.roles_cache.add_roles(id, &roles);
            roles
        }
    }

    fn get_acl<'a, T, C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static>(
        &self,
        db_conn: &'a C,
        user_id: Option<UserId>,
    ) -> Box<Acl<Resource, Action, Scope, FailureError, T>> {
        user_id.map_or(
            Box::new(UnauthorizedACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, T>>,
            |id| {
                let roles = self.get_roles(id, db_conn);
                (Box::new(ApplicationAcl::new(roles, id)) as Box<Acl<Resource, Action, Scope, FailureError, T>>)
            },
        )
    }
}

impl<C> ReposFactory<C> for ReposFactoryImpl
where
    C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
{
    fn create_merchants_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<MerchantsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(MerchantsRepoImpl::new(db_conn, acl)) as Box<MerchantsRepo>
    }

    fn create_merchants_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<MerchantsRepo + 'a> {
        Box::new(MerchantsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, Merchant>>,
        )) as Box<MerchantsRepo>
    }

    fn create_merchant_documents_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<MerchantDocumentsRepo + 'a> {
        Box::new(MerchantDocumentsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, MerchantDocument>>,
        )) as Box<MerchantDocumentsRepo>
    }

    fn create_agents_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<AgentsRepo + 'a> {
        Box::new(AgentsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, Agent>>,
        )) as Box<AgentsRepo>
    }

    fn create_api_keys_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<ApiKeysRepo + 'a> {
        Box::new(ApiKeysRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, ApiKey>>,
        )) as Box<ApiKeysRepo>
    }

    fn create_usage_records_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UsageRecordsRepo + 'a> {
        Box::new(UsageRecordsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, UsageRecord>>,
        )) as Box<UsageRecordsRepo>
    }

    fn create_user_roles_repo<'a>(&self, db_conn: &'a C, user_id: Option<UserId>) -> Box<UserRolesRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(UserRolesRepoImpl::new(db_conn, acl)) as Box<UserRolesRepo>
    }

    fn create_user_roles_repo_with_sys_acl<'a>(&self, db_conn: &'a C) -> Box<UserRolesRepo + 'a> {
        Box::new(UserRolesRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, UserRole>>,
        )) as Box<UserRolesRepo>
    }
}

#[cfg(test)]
pub mod tests {
    //! Stateful in-memory mocks mirroring the sql semantics of the real
    //! repos, shared by the service level tests.

    use std::collections::HashMap;
    use std::error::Error as StdError;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDateTime, Timelike, Utc};
    use diesel::connection::AnsiTransactionManager;
    use diesel::connection::SimpleConnection;
    use diesel::deserialize::QueryableByName;
    use diesel::pg::Pg;
    use diesel::query_builder::AsQuery;
    use diesel::query_builder::QueryFragment;
    use diesel::query_builder::QueryId;
    use diesel::sql_types::HasSqlType;
    use diesel::Connection;
    use diesel::ConnectionResult;
    use diesel::QueryResult;
    use diesel::Queryable;
    use r2d2::ManageConnection;

    use errors::Error;
    use models::*;
    use repos::*;

    #[derive(Default)]
    pub struct MockStore {
        pub merchants: HashMap<MerchantId, Merchant>,
        pub documents: Vec<MerchantDocument>,
        pub agents: HashMap<AgentId, Agent>,
        pub api_keys: HashMap<ApiKeyId, ApiKey>,
        pub usage_records: Vec<UsageRecord>,
    }

    #[derive(Clone, Default)]
    pub struct ReposFactoryMock {
        pub store: Arc<Mutex<MockStore>>,
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    impl<C: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> ReposFactory<C> for ReposFactoryMock {
        fn create_merchants_repo<'a>(&self, _db_conn: &'a C, _user_id: Option<UserId>) -> Box<MerchantsRepo + 'a> {
            Box::new(MerchantsRepoMock {
                store: self.store.clone(),
            })
        }

        fn create_merchants_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<MerchantsRepo + 'a> {
            Box::new(MerchantsRepoMock {
                store: self.store.clone(),
            })
        }

        fn create_merchant_documents_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<MerchantDocumentsRepo + 'a> {
            Box::new(MerchantDocumentsRepoMock {
                store: self.store.clone(),
            })
        }

        fn create_agents_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<AgentsRepo + 'a> {
            Box::new(AgentsRepoMock {
                store: self.store.clone(),
            })
        }

        fn create_api_keys_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<ApiKeysRepo + 'a> {
            Box::new(ApiKeysRepoMock {
                store: self.store.clone(),
            })
        }

        fn create_usage_records_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<UsageRecordsRepo + 'a> {
            Box::new(UsageRecordsRepoMock {
                store: self.store.clone(),
            })
        }

        fn create_user_roles_repo<'a>(&self, _db_conn: &'a C, _user_id: Option<UserId>) -> Box<UserRolesRepo + 'a> {
            Box::new(UserRolesRepoMock::default())
        }

        fn create_user_roles_repo_with_sys_acl<'a>(&self, _db_conn: &'a C) -> Box<UserRolesRepo + 'a> {
            Box::new(UserRolesRepoMock::default())
        }
    }

    pub struct MerchantsRepoMock {
        store: Arc<Mutex<MockStore>>,
    }

    impl MerchantsRepoMock {
        fn transition<F>(&self, merchant_id: MerchantId, expected: MerchantStatus, apply: F) -> RepoResult<Merchant>
        where
            F: FnOnce(&mut Merchant),
        {
            let mut store = self.store.lock().unwrap();
            match store.merchants.get_mut(&merchant_id) {
                None => Err(Error::NotFound.into()),
                Some(merchant) => {
                    if merchant.status != expected || merchant.deleted_at.is_some() {
                        return Err(Error::ConcurrentModification.into());
                    }
                    apply(merchant);
                    merchant.updated_at = now();
                    Ok(merchant.clone())
                }
            }
        }
    }

    impl MerchantsRepo for MerchantsRepoMock {
        fn get(&self, merchant_id: MerchantId) -> RepoResult<Option<Merchant>> {
            let store = self.store.lock().unwrap();
            Ok(store.merchants.get(&merchant_id).cloned())
        }

        fn create(&self, payload: NewMerchant) -> RepoResult<Merchant> {
            let mut store = self.store.lock().unwrap();
            let merchant = Merchant {
                id: payload.id().clone(),
                legal_name: payload.legal_name().to_string(),
                contact_email: payload.contact_email().to_string(),
                country: payload.country().to_string(),
                monthly_volume: payload.monthly_volume().clone(),
                status: MerchantStatus::PendingDocuments,
                psp_provider: None,
                psp_validated: false,
                psp_last_verified_at: None,
                rejection_reason: None,
                created_at: now(),
                updated_at: now(),
                deleted_at: None,
            };
            store.merchants.insert(merchant.id.clone(), merchant.clone());
            Ok(merchant)
        }

        fn set_status(&self, merchant_id: MerchantId, expected: MerchantStatus, next: MerchantStatus) -> RepoResult<Merchant> {
            self.transition(merchant_id, expected, |merchant| {
                merchant.status = next;
            })
        }

        fn set_status_rejected(&self, merchant_id: MerchantId, expected: MerchantStatus, reason: String) -> RepoResult<Merchant> {
            self.transition(merchant_id, expected, |merchant| {
                merchant.status = MerchantStatus::Rejected;
                merchant.rejection_reason = Some(reason);
            })
        }

        fn set_status_active_with_psp(
            &self,
            merchant_id: MerchantId,
            expected: MerchantStatus,
            provider: PspProvider,
            verified_at: NaiveDateTime,
        ) -> RepoResult<Merchant> {
            self.transition(merchant_id, expected, |merchant| {
                merchant.status = MerchantStatus::Active;
                merchant.psp_provider = Some(provider);
                merchant.psp_validated = true;
                merchant.psp_last_verified_at = Some(verified_at);
            })
        }

        fn soft_delete(&self, merchant_id: MerchantId) -> RepoResult<Merchant> {
            let mut store = self.store.lock().unwrap();
            match store.merchants.get_mut(&merchant_id) {
                None => Err(Error::NotFound.into()),
                Some(merchant) => {
                    if merchant.deleted_at.is_some() {
                        return Err(Error::ConcurrentModification.into());
                    }
                    merchant.status = MerchantStatus::Deleted;
                    merchant.deleted_at = Some(now());
                    merchant.updated_at = now();
                    Ok(merchant.clone())
                }
            }
        }

        fn funnel(&self) -> RepoResult<Vec<FunnelRow>> {
            let store = self.store.lock().unwrap();
            let mut counts: HashMap<String, i64> = HashMap::new();
            for merchant in store.merchants.values() {
                *counts.entry(merchant.status.to_string()).or_insert(0) += 1;
            }
            let mut rows = counts
                .into_iter()
                .map(|(status, merchants)| FunnelRow { status, merchants })
                .collect::<Vec<_>>();
            rows.sort_by(|a, b| a.status.cmp(&b.status));
            Ok(rows)
        }
    }

    pub struct MerchantDocumentsRepoMock {
        store: Arc<Mutex<MockStore>>,
    }

    impl MerchantDocumentsRepo for MerchantDocumentsRepoMock {
        fn create(&self, payload: NewMerchantDocument) -> RepoResult<MerchantDocument> {
            let mut store = self.store.lock().unwrap();
            let document = MerchantDocument {
                id: payload.id(),
                merchant_id: payload.merchant_id().clone(),
                document_type: payload.document_type(),
                blob_ref: payload.blob_ref().to_string(),
                uploaded_at: now(),
            };
            store.documents.push(document.clone());
            Ok(document)
        }

        fn list_for_merchant(&self, merchant_id_arg: MerchantId) -> RepoResult<Vec<MerchantDocument>> {
            let store = self.store.lock().unwrap();
            Ok(store
                .documents
                .iter()
                .filter(|document| document.merchant_id == merchant_id_arg)
                .cloned()
                .collect())
        }
    }

    pub struct AgentsRepoMock {
        store: Arc<Mutex<MockStore>>,
    }

    impl AgentsRepo for AgentsRepoMock {
        fn get(&self, agent_id: AgentId) -> RepoResult<Option<Agent>> {
            let store = self.store.lock().unwrap();
            Ok(store.agents.get(&agent_id).cloned())
        }

        fn get_or_create(&self, payload: NewAgent) -> RepoResult<Agent> {
            let mut store = self.store.lock().unwrap();
            if let Some(existing) = store
                .agents
                .values()
                .find(|agent| agent.external_subject == payload.external_subject())
            {
                return Ok(existing.clone());
            }
            let agent = Agent {
                id: payload.id().clone(),
                external_subject: payload.external_subject().to_string(),
                display_name: payload.display_name().to_string(),
                contact_email: payload.contact_email().to_string(),
                is_active: payload.is_active(),
                created_at: now(),
            };
            store.agents.insert(agent.id.clone(), agent.clone());
            Ok(agent)
        }
    }

    pub struct ApiKeysRepoMock {
        store: Arc<Mutex<MockStore>>,
    }

    impl ApiKeysRepo for ApiKeysRepoMock {
        fn get(&self, key_id: ApiKeyId) -> RepoResult<Option<ApiKey>> {
            let store = self.store.lock().unwrap();
            Ok(store.api_keys.get(&key_id).cloned())
        }

        fn create(&self, payload: NewApiKey) -> RepoResult<ApiKey> {
            let mut store = self.store.lock().unwrap();
            let key = ApiKey {
                id: payload.id().clone(),
                tenant_id: payload.tenant_id().clone(),
                key_hash: payload.key_hash().clone(),
                key_prefix: payload.key_prefix().clone(),
                created_at: now(),
                revoked_at: None,
                last_used_at: None,
            };
            store.api_keys.insert(key.id.clone(), key.clone());
            Ok(key)
        }

        fn list_active_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ApiKey>> {
            let store = self.store.lock().unwrap();
            Ok(store
                .api_keys
                .values()
                .filter(|key| key.tenant_id == tenant && !key.is_revoked())
                .cloned()
                .collect())
        }

        fn find_active_by_prefix(&self, prefix: KeyPrefix) -> RepoResult<Vec<ApiKey>> {
            let store = self.store.lock().unwrap();
            Ok(store
                .api_keys
                .values()
                .filter(|key| key.key_prefix == prefix && !key.is_revoked())
                .cloned()
                .collect())
        }

        fn revoke(&self, key_id: ApiKeyId) -> RepoResult<ApiKey> {
            let mut store = self.store.lock().unwrap();
            match store.api_keys.get_mut(&key_id) {
                None => Err(Error::NotFound.into()),
                Some(key) => {
                    if key.revoked_at.is_none() {
                        key.revoked_at = Some(now());
                    }
                    Ok(key.clone())
                }
            }
        }

        fn revoke_all_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ApiKey>> {
            let mut store = self.store.lock().unwrap();
            let mut revoked = Vec::new();
            for key in store.api_keys.values_mut() {
                if key.tenant_id == tenant && key.revoked_at.is_none() {
                    key.revoked_at = Some(now());
                    revoked.push(key.clone());
                }
            }
            Ok(revoked)
        }

        fn touch_last_used(&self, key_id: ApiKeyId) -> RepoResult<()> {
            let mut store = self.store.lock().unwrap();
            if let Some(key) = store.api_keys.get_mut(&key_id) {
                key.last_used_at = Some(now());
            }
            Ok(())
        }
    }

    pub struct UsageRecordsRepoMock {
        store: Arc<Mutex<MockStore>>,
    }

    impl UsageRecordsRepo for UsageRecordsRepoMock {
        fn create(&self, payload: NewUsageRecord) -> RepoResult<UsageRecord> {
            let mut store = self.store.lock().unwrap();
            let record = UsageRecord {
                id: store.usage_records.len() as i64 + 1,
                tenant_id: payload.tenant_id().to_string(),
                endpoint: payload.endpoint().to_string(),
                outcome: payload.outcome(),
                error_kind: payload.error_kind().map(|kind| kind.to_string()),
                latency_ms: payload.latency_ms(),
                created_at: now(),
            };
            store.usage_records.push(record.clone());
            Ok(record)
        }

        fn summary_for_tenant(&self, tenant: TenantId, since: NaiveDateTime) -> RepoResult<Vec<UsageSummaryRow>> {
            let store = self.store.lock().unwrap();
            let mut grouped: HashMap<(String, String), (i64, i64)> = HashMap::new();
            for record in store
                .usage_records
                .iter()
                .filter(|record| record.tenant_id == tenant.to_string() && record.created_at >= since)
            {
                let entry = grouped
                    .entry((record.endpoint.clone(), record.outcome.to_string()))
                    .or_insert((0, 0));
                entry.0 += 1;
                entry.1 += i64::from(record.latency_ms);
            }
            let mut rows = grouped
                .into_iter()
                .map(|((endpoint, outcome), (calls, latency_total))| UsageSummaryRow {
                    endpoint,
                    outcome,
                    calls,
                    avg_latency_ms: latency_total as f64 / calls as f64,
                })
                .collect::<Vec<_>>();
            rows.sort_by(|a, b| (&a.endpoint, &a.outcome).cmp(&(&b.endpoint, &b.outcome)));
            Ok(rows)
        }

        fn timeline_for_tenant(&self, tenant: TenantId, since: NaiveDateTime) -> RepoResult<Vec<UsageTimelineRow>> {
            let store = self.store.lock().unwrap();
            let mut grouped: HashMap<NaiveDateTime, (i64, i64)> = HashMap::new();
            for record in store
                .usage_records
                .iter()
                .filter(|record| record.tenant_id == tenant.to_string() && record.created_at >= since)
            {
                let bucket = record.created_at.date().and_hms(record.created_at.time().hour(), 0, 0);
                let entry = grouped.entry(bucket).or_insert((0, 0));
                entry.0 += 1;
                if record.outcome == UsageOutcome::Error {
                    entry.1 += 1;
                }
            }
            let mut rows = grouped
                .into_iter()
                .map(|(bucket, (calls, errors))| UsageTimelineRow { bucket, calls, errors })
                .collect::<Vec<_>>();
            rows.sort_by_key(|row| row.bucket);
            Ok(rows)
        }
    }

    #[derive(Clone, Default)]
    pub struct UserRolesRepoMock;

    impl UserRolesRepo for UserRolesRepoMock {
        fn list_for_user(&self, user_id_value: UserId) -> RepoResult<Vec<Role>> {
            Ok(match user_id_value.0 {
                1 => vec![Role::Superuser],
                _ => vec![Role::Employee],
            })
        }

        fn create(&self, payload: NewUserRole) -> RepoResult<UserRole> {
            Ok(UserRole {
                id: RoleId::new(),
                user_id: payload.user_id,
                name: payload.name,
                data: None,
            })
        }

        fn delete_by_user_id(&self, user_id_arg: UserId) -> RepoResult<Vec<UserRole>> {
            Ok(vec![UserRole {
                id: RoleId::new(),
                user_id: user_id_arg,
                name: Role::Employee,
                data: None,
            }])
        }

        fn delete_by_id(&self, id: RoleId) -> RepoResult<UserRole> {
            Ok(UserRole {
                id,
                user_id: UserId(1),
                name: Role::Employee,
                data: None,
            })
        }
    }

    /// Builds a service over the mock repos with a local rate limiter,
    /// the given psp verifier and the given caller identities
    pub fn create_service(
        repo_factory: ReposFactoryMock,
        psp_verifier: Arc<dyn (::client::psp::PspVerifier)>,
        user_id: Option<UserId>,
        tenant: Option<TenantContext>,
    ) -> ::services::Service<MockConnection, MockConnectionManager, ReposFactoryMock> {
        use controller::context::{DynamicContext, StaticContext};
        use futures_cpupool::CpuPool;
        use rate_limit::LocalRateLimiter;
        use repos::acl::RolesCacheImpl;

        let manager = MockConnectionManager::default();
        let db_pool = ::r2d2::Pool::builder().build(manager).expect("Failed to create connection pool");
        let cpu_pool = CpuPool::new(1);

        let config = ::config::Config::new().expect("Could not create config");
        let rate_limiter = Arc::new(LocalRateLimiter::new(config.rate_limits.clone()));

        let static_context = StaticContext::new(
            db_pool,
            cpu_pool,
            Arc::new(config),
            repo_factory,
            RolesCacheImpl::default(),
            psp_verifier,
            rate_limiter,
        );
        let dynamic_context = DynamicContext::new(user_id, tenant, String::default());

        ::services::Service::new(static_context, dynamic_context)
    }

    #[derive(Default)]
    pub struct MockConnection {
        tr: AnsiTransactionManager,
    }

    impl Connection for MockConnection {
        type Backend = Pg;
        type TransactionManager = AnsiTransactionManager;

        fn establish(_database_url: &str) -> ConnectionResult<MockConnection> {
            Ok(MockConnection::default())
        }

        fn execute(&self, _query: &str) -> QueryResult<usize> {
            unimplemented!()
        }

        fn query_by_index<T, U>(&self, _source: T) -> QueryResult<Vec<U>>
        where
            T: AsQuery,
            T::Query: QueryFragment<Pg> + QueryId,
            Pg: HasSqlType<T::SqlType>,
            U: Queryable<T::SqlType, Pg>,
        {
            unimplemented!()
        }

        fn query_by_name<T, U>(&self, _source: &T) -> QueryResult<Vec<U>>
        where
            T: QueryFragment<Pg> + QueryId,
            U: QueryableByName<Pg>,
        {
            unimplemented!()
        }

        fn execute_returning_count<T>(&self, _source: &T) -> QueryResult<usize>
        where
            T: QueryFragment<Pg> + QueryId,
        {
            unimplemented!()
        }

        fn transaction_manager(&self) -> &Self::TransactionManager {
            &self.tr
        }
    }

    impl SimpleConnection for MockConnection {
        fn batch_execute(&self, _query: &str) -> QueryResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockConnectionManager;

    impl ManageConnection for MockConnectionManager {
        type Connection = MockConnection;
        type Error = MockError;

        fn connect(&self) -> Result<MockConnection, MockError> {
            Ok(MockConnection::default())
        }

        fn is_valid(&self, _conn: &mut MockConnection) -> Result<(), MockError> {
            Ok(())
        }

        fn has_broken(&self, _conn: &mut MockConnection) -> bool {
            false
        }
    }

    #[derive(Debug)]
    pub struct MockError {}

    impl fmt::Display for MockError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "MockError is here!")
        }
    }

    impl StdError for MockError {
        fn description(&self) -> &str {
            "mock connection never fails"
        }

        fn cause(&self) -> Option<&StdError> {
            None
        }
    }
}
