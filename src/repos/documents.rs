//! Repo for merchant_documents table. Documents are append-only per
//! merchant; completeness of the required set is judged by the service.

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
use models::authorization::*;
use models::{MerchantDocument, MerchantId, NewMerchantDocument, UserId};
use schema::merchant_documents::dsl::*;

pub trait MerchantDocumentsRepo {
    /// Append a document to the merchant's set
    fn create(&self, payload: NewMerchantDocument) -> RepoResult<MerchantDocument>;

    /// All documents uploaded for a merchant
    fn list_for_merchant(&self, merchant_id_arg: MerchantId) -> RepoResult<Vec<MerchantDocument>>;
}

pub struct MerchantDocumentsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, MerchantDocument>>,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> MerchantDocumentsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<Acl<Resource, Action, Scope, FailureError, MerchantDocument>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> MerchantDocumentsRepo
    for MerchantDocumentsRepoImpl<'a, T>
{
    fn create(&self, payload: NewMerchantDocument) -> RepoResult<MerchantDocument> {
        debug!("Create new merchant document {} in db.", payload);
        let query = diesel::insert_into(merchant_documents).values(&payload);
        query
            .get_result(self.db_conn)
            .map_err(From::from)
            .and_then(|document| {
                acl::check(&*self.acl, Resource::MerchantDocument, Action::Write, self, Some(&document))?;
                Ok(document)
            })
            .map_err(|e: FailureError| e.context(format!("Create a new merchant document {} error occured", payload)).into())
    }

    fn list_for_merchant(&self, merchant_id_arg: MerchantId) -> RepoResult<Vec<MerchantDocument>> {
        debug!("List documents of merchant {} from db.", merchant_id_arg);
        merchant_documents
            .filter(merchant_id.eq(merchant_id_arg.clone()))
            .order(uploaded_at.asc())
            .get_results::<MerchantDocument>(self.db_conn)
            .map_err(|e| {
                FailureError::from(e)
                    .context(format!("List documents of merchant {} error occured", merchant_id_arg))
                    .into()
            })
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, MerchantDocument>
    for MerchantDocumentsRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&MerchantDocument>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}
