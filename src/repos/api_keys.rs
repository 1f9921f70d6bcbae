//! Repo for api_keys table. Revocation is monotonic: `revoked_at` is set
//! at most once and never cleared, and revoking an already revoked key is
//! a no-op success.

use chrono::Utc;
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use repos::legacy_acl::*;

use super::acl;
use super::types::RepoResult;
use errors::Error;
use models::authorization::*;
use models::{ApiKey, ApiKeyId, KeyPrefix, NewApiKey, TenantId, UserId};
use schema::api_keys::dsl::*;

pub trait ApiKeysRepo {
    /// Returns key row by id
    fn get(&self, key_id: ApiKeyId) -> RepoResult<Option<ApiKey>>;

    /// Store a freshly issued key
    fn create(&self, payload: NewApiKey) -> RepoResult<ApiKey>;

    /// Live (non-revoked) keys of a tenant
    fn list_active_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ApiKey>>;

    /// Live keys sharing a display prefix - the authentication candidates
    fn find_active_by_prefix(&self, prefix: KeyPrefix) -> RepoResult<Vec<ApiKey>>;

    /// Idempotent revocation
    fn revoke(&self, key_id: ApiKeyId) -> RepoResult<ApiKey>;

    /// Revoke every live key of a tenant, returning the revoked rows
    fn revoke_all_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ApiKey>>;

    /// Record key usage; best effort bookkeeping for the portals
    fn touch_last_used(&self, key_id: ApiKeyId) -> RepoResult<()>;
}

pub struct ApiKeysRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, ApiKey>>,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> ApiKeysRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<Acl<Resource, Action, Scope, FailureError, ApiKey>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> ApiKeysRepo for ApiKeysRepoImpl<'a, T> {
    fn get(&self, key_id: ApiKeyId) -> RepoResult<Option<ApiKey>> {
        debug!("Returns api key {} from db.", key_id);
        api_keys
            .filter(id.eq(key_id.clone()))
            .get_result::<ApiKey>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|key| {
                if let Some(ref key) = key {
                    acl::check(&*self.acl, Resource::ApiKey, Action::Read, self, Some(key))?;
                }
                Ok(key)
            })
            .map_err(|e: FailureError| e.context(format!("Get api key {} error occured", key_id)).into())
    }

    fn create(&self, payload: NewApiKey) -> RepoResult<ApiKey> {
        debug!("Create new api key {} in db.", payload);
        let query = diesel::insert_into(api_keys).values(&payload);
        query
            .get_result(self.db_conn)
            .map_err(From::from)
            .and_then(|key| {
                acl::check(&*self.acl, Resource::ApiKey, Action::Write, self, Some(&key))?;
                Ok(key)
            })
            .map_err(|e: FailureError| e.context(format!("Create a new api key {} error occured", payload)).into())
    }

    fn list_active_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ApiKey>> {
        debug!("List active api keys of tenant {} from db.", tenant);
        api_keys
            .filter(tenant_id.eq(tenant.clone()).and(revoked_at.is_null()))
            .order(created_at.asc())
            .get_results::<ApiKey>(self.db_conn)
            .map_err(|e| {
                FailureError::from(e)
                    .context(format!("List active api keys of tenant {} error occured", tenant))
                    .into()
            })
    }

    fn find_active_by_prefix(&self, prefix: KeyPrefix) -> RepoResult<Vec<ApiKey>> {
        debug!("Find active api keys by prefix {} in db.", prefix);
        api_keys
            .filter(key_prefix.eq(prefix.clone()).and(revoked_at.is_null()))
            .get_results::<ApiKey>(self.db_conn)
            .map_err(|e| {
                FailureError::from(e)
                    .context(format!("Find active api keys by prefix {} error occured", prefix))
                    .into()
            })
    }

    fn revoke(&self, key_id: ApiKeyId) -> RepoResult<ApiKey> {
        debug!("Revoke api key {} in db.", key_id);
        let now = Utc::now().naive_utc();
        let filtered = api_keys.filter(id.eq(key_id.clone()).and(revoked_at.is_null()));
        diesel::update(filtered)
            .set(revoked_at.eq(now))
            .get_result::<ApiKey>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|revoked| match revoked {
                Some(key) => {
                    acl::check(&*self.acl, Resource::ApiKey, Action::Write, self, Some(&key))?;
                    Ok(key)
                }
                // already revoked keys stay revoked; report the row as is
                None => api_keys
                    .filter(id.eq(key_id.clone()))
                    .get_result::<ApiKey>(self.db_conn)
                    .optional()
                    .map_err(FailureError::from)
                    .and_then(|existing| existing.ok_or_else(|| Error::NotFound.into())),
            })
            .map_err(|e: FailureError| e.context(format!("Revoke api key {} error occured", key_id)).into())
    }

    fn revoke_all_for_tenant(&self, tenant: TenantId) -> RepoResult<Vec<ApiKey>> {
        debug!("Revoke all api keys of tenant {} in db.", tenant);
        let now = Utc::now().naive_utc();
        let filtered = api_keys.filter(tenant_id.eq(tenant.clone()).and(revoked_at.is_null()));
        diesel::update(filtered)
            .set(revoked_at.eq(now))
            .get_results::<ApiKey>(self.db_conn)
            .map_err(|e| {
                FailureError::from(e)
                    .context(format!("Revoke all api keys of tenant {} error occured", tenant))
                    .into()
            })
    }

    fn touch_last_used(&self, key_id: ApiKeyId) -> RepoResult<()> {
        let now = Utc::now().naive_utc();
        diesel::update(api_keys.filter(id.eq(key_id.clone())))
            .set(last_used_at.eq(now))
            .execute(self.db_conn)
            .map(|_| ())
            .map_err(|e| {
                FailureError::from(e)
                    .context(format!("Touch last_used_at of api key {} error occured", key_id))
                    .into()
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, ApiKey>
    for ApiKeysRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&ApiKey>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}
