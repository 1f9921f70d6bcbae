//! Repo for merchants table. All state machine transitions go through
//! conditional updates guarded by the expected current status, so two
//! concurrent transitions can never both apply.

use chrono::{NaiveDateTime, Utc};
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::sql_query;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;

use repos::legacy_acl::*;

use super::acl;
use super::types::RepoResult;
use errors::Error;
use models::authorization::*;
use models::{FunnelRow, Merchant, MerchantId, MerchantStatus, NewMerchant, PspProvider, UserId};
use schema::merchants::dsl::*;

/// Merchants repository for handling merchant accounts
pub trait MerchantsRepo {
    /// Returns merchant by id, soft-deleted rows included
    fn get(&self, merchant_id: MerchantId) -> RepoResult<Option<Merchant>>;

    /// Create a new merchant in `pending_documents`
    fn create(&self, payload: NewMerchant) -> RepoResult<Merchant>;

    /// Compare-and-swap transition of the status column
    fn set_status(&self, merchant_id: MerchantId, expected: MerchantStatus, next: MerchantStatus) -> RepoResult<Merchant>;

    /// Transition to `rejected`, recording the reviewer's reason
    fn set_status_rejected(&self, merchant_id: MerchantId, expected: MerchantStatus, reason: String) -> RepoResult<Merchant>;

    /// Transition to `active` recording the verified psp binding
    fn set_status_active_with_psp(
        &self,
        merchant_id: MerchantId,
        expected: MerchantStatus,
        provider: PspProvider,
        verified_at: NaiveDateTime,
    ) -> RepoResult<Merchant>;

    /// Soft delete - rows are kept for the audit trail
    fn soft_delete(&self, merchant_id: MerchantId) -> RepoResult<Merchant>;

    /// Merchant counts per onboarding stage
    fn funnel(&self) -> RepoResult<Vec<FunnelRow>>;
}

/// Implementation of MerchantsRepo trait
pub struct MerchantsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Merchant>>,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> MerchantsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<Acl<Resource, Action, Scope, FailureError, Merchant>>) -> Self {
        Self { db_conn, acl }
    }

    /// A conditional update matched no row: either the merchant does not
    /// exist, or its status moved under us.
    fn precondition_failed(&self, merchant_id: MerchantId) -> FailureError {
        let existing = merchants
            .filter(id.eq(merchant_id.clone()))
            .get_result::<Merchant>(self.db_conn)
            .optional();
        match existing {
            Ok(Some(_)) => Error::ConcurrentModification.into(),
            Ok(None) => Error::NotFound.into(),
            Err(e) => FailureError::from(e),
        }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> MerchantsRepo for MerchantsRepoImpl<'a, T> {
    fn get(&self, merchant_id: MerchantId) -> RepoResult<Option<Merchant>> {
        debug!("Returns merchant {} from db.", merchant_id);
        merchants
            .filter(id.eq(merchant_id.clone()))
            .get_result::<Merchant>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|merch| {
                if let Some(ref merch) = merch {
                    acl::check(&*self.acl, Resource::Merchant, Action::Read, self, Some(merch))?;
                }
                Ok(merch)
            })
            .map_err(|e: FailureError| e.context(format!("Get merchant {} error occured", merchant_id)).into())
    }

    fn create(&self, payload: NewMerchant) -> RepoResult<Merchant> {
        debug!("Create new merchant {} in db.", payload);
        let query = diesel::insert_into(merchants).values(&payload);
        query
            .get_result(self.db_conn)
            .map_err(From::from)
            .and_then(|merch| {
                acl::check(&*self.acl, Resource::Merchant, Action::Write, self, Some(&merch))?;
                Ok(merch)
            })
            .map_err(|e: FailureError| e.context(format!("Create a new merchant {} error occured", payload)).into())
    }

    fn set_status(&self, merchant_id: MerchantId, expected: MerchantStatus, next: MerchantStatus) -> RepoResult<Merchant> {
        debug!("Transition merchant {} from {} to {} in db.", merchant_id, expected, next);
        let now = Utc::now().naive_utc();
        let filtered = merchants.filter(id.eq(merchant_id.clone()).and(status.eq(expected)).and(deleted_at.is_null()));
        diesel::update(filtered)
            .set((status.eq(next), updated_at.eq(now)))
            .get_result::<Merchant>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|updated| match updated {
                Some(merch) => {
                    acl::check(&*self.acl, Resource::Merchant, Action::Write, self, Some(&merch))?;
                    Ok(merch)
                }
                None => Err(self.precondition_failed(merchant_id.clone())),
            })
            .map_err(|e: FailureError| {
                e.context(format!("Transition merchant {} from {} to {} error occured", merchant_id, expected, next))
                    .into()
            })
    }

    fn set_status_rejected(&self, merchant_id: MerchantId, expected: MerchantStatus, reason: String) -> RepoResult<Merchant> {
        debug!("Reject merchant {} in db.", merchant_id);
        let now = Utc::now().naive_utc();
        let filtered = merchants.filter(id.eq(merchant_id.clone()).and(status.eq(expected)).and(deleted_at.is_null()));
        diesel::update(filtered)
            .set((
                status.eq(MerchantStatus::Rejected),
                rejection_reason.eq(reason),
                updated_at.eq(now),
            ))
            .get_result::<Merchant>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|updated| match updated {
                Some(merch) => {
                    acl::check(&*self.acl, Resource::Merchant, Action::Write, self, Some(&merch))?;
                    Ok(merch)
                }
                None => Err(self.precondition_failed(merchant_id.clone())),
            })
            .map_err(|e: FailureError| e.context(format!("Reject merchant {} error occured", merchant_id)).into())
    }

    fn set_status_active_with_psp(
        &self,
        merchant_id: MerchantId,
        expected: MerchantStatus,
        provider: PspProvider,
        verified_at: NaiveDateTime,
    ) -> RepoResult<Merchant> {
        debug!("Activate merchant {} with psp {} in db.", merchant_id, provider);
        let now = Utc::now().naive_utc();
        let filtered = merchants.filter(id.eq(merchant_id.clone()).and(status.eq(expected)).and(deleted_at.is_null()));
        diesel::update(filtered)
            .set((
                status.eq(MerchantStatus::Active),
                psp_provider.eq(provider),
                psp_validated.eq(true),
                psp_last_verified_at.eq(verified_at),
                updated_at.eq(now),
            ))
            .get_result::<Merchant>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|updated| match updated {
                Some(merch) => {
                    acl::check(&*self.acl, Resource::Merchant, Action::Write, self, Some(&merch))?;
                    Ok(merch)
                }
                None => Err(self.precondition_failed(merchant_id.clone())),
            })
            .map_err(|e: FailureError| e.context(format!("Activate merchant {} error occured", merchant_id)).into())
    }

    fn soft_delete(&self, merchant_id: MerchantId) -> RepoResult<Merchant> {
        debug!("Soft delete merchant {} in db.", merchant_id);
        let now = Utc::now().naive_utc();
        let filtered = merchants.filter(id.eq(merchant_id.clone()).and(deleted_at.is_null()));
        diesel::update(filtered)
            .set((status.eq(MerchantStatus::Deleted), deleted_at.eq(now), updated_at.eq(now)))
            .get_result::<Merchant>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|updated| match updated {
                Some(merch) => {
                    acl::check(&*self.acl, Resource::Merchant, Action::Write, self, Some(&merch))?;
                    Ok(merch)
                }
                None => Err(self.precondition_failed(merchant_id.clone())),
            })
            .map_err(|e: FailureError| e.context(format!("Soft delete merchant {} error occured", merchant_id)).into())
    }

    fn funnel(&self) -> RepoResult<Vec<FunnelRow>> {
        debug!("Counting merchants per onboarding stage in db.");
        acl::check(&*self.acl, Resource::Merchant, Action::Read, self, None)?;
        sql_query("SELECT status, COUNT(*) AS merchants FROM merchants GROUP BY status ORDER BY status")
            .get_results::<FunnelRow>(self.db_conn)
            .map_err(|e| FailureError::from(e).context("Funnel query error occured").into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, Merchant>
    for MerchantsRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&Merchant>) -> bool {
        match *scope {
            Scope::All => true,
            // merchant rows are not owned by portal users
            Scope::Owned => false,
        }
    }
}
