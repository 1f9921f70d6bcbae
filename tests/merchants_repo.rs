extern crate authorization_lib;
extern crate bigdecimal;
extern crate chrono;
extern crate diesel;
extern crate failure;

use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::Connection;

use authorization_lib::models::{
    DocumentType, MerchantStatus, NewMerchant, NewMerchantDocument, NewMerchantPayload, PspProvider,
};
use authorization_lib::repos::legacy_acl::SystemACL;
use authorization_lib::repos::{MerchantDocumentsRepo, MerchantDocumentsRepoImpl, MerchantsRepo, MerchantsRepoImpl};

fn with_test_db_conn<F, T>(f: F) -> T
where
    F: FnOnce(&PgConnection) -> T,
{
    let config = authorization_lib::config::Config::new().unwrap();
    let database_url = config.server.database.parse::<String>().unwrap();
    let db_conn = PgConnection::establish(&database_url).unwrap();

    f(&db_conn)
}

fn registration() -> NewMerchantPayload {
    NewMerchantPayload {
        legal_name: "Acme Inc".to_string(),
        contact_email: "ops@acme.example".to_string(),
        country: "US".to_string(),
        monthly_volume: BigDecimal::from(25_000),
    }
}

#[test]
#[ignore] // needs a live database
fn merchants_repo_drives_the_state_machine() {
    let new_merchant = NewMerchant::new(registration());
    let merchant_id = new_merchant.id().clone();

    let created = with_test_db_conn(|conn| {
        let repo = MerchantsRepoImpl::new(conn, Box::new(SystemACL::default()));
        repo.create(new_merchant)
    }).unwrap();
    assert_eq!(created.status, MerchantStatus::PendingDocuments);

    let reviewed = {
        let merchant_id = merchant_id.clone();
        with_test_db_conn(move |conn| {
            let repo = MerchantsRepoImpl::new(conn, Box::new(SystemACL::default()));
            let documents_repo = MerchantDocumentsRepoImpl::new(conn, Box::new(SystemACL::default()));
            documents_repo
                .create(NewMerchantDocument::new(
                    merchant_id.clone(),
                    DocumentType::BusinessLicense,
                    "s3://kyb/license".to_string(),
                ))
                .unwrap();
            repo.set_status(merchant_id.clone(), MerchantStatus::PendingDocuments, MerchantStatus::PendingReview)
                .and_then(|_| repo.set_status(merchant_id, MerchantStatus::PendingReview, MerchantStatus::PendingPsp))
        })
    }.unwrap();
    assert_eq!(reviewed.status, MerchantStatus::PendingPsp);

    let activated = {
        let merchant_id = merchant_id.clone();
        with_test_db_conn(move |conn| {
            let repo = MerchantsRepoImpl::new(conn, Box::new(SystemACL::default()));
            repo.set_status_active_with_psp(
                merchant_id,
                MerchantStatus::PendingPsp,
                PspProvider::Stripe,
                Utc::now().naive_utc(),
            )
        })
    }.unwrap();
    assert_eq!(activated.status, MerchantStatus::Active);
    assert!(activated.psp_validated);

    let deleted = with_test_db_conn(move |conn| {
        let repo = MerchantsRepoImpl::new(conn, Box::new(SystemACL::default()));
        repo.soft_delete(merchant_id)
    }).unwrap();
    assert_eq!(deleted.status, MerchantStatus::Deleted);
    assert!(deleted.deleted_at.is_some());
}

#[test]
#[ignore] // needs a live database
fn merchants_repo_rejects_stale_transitions() {
    let new_merchant = NewMerchant::new(registration());
    let merchant_id = new_merchant.id().clone();

    with_test_db_conn({
        let merchant_id = merchant_id.clone();
        move |conn| {
            let repo = MerchantsRepoImpl::new(conn, Box::new(SystemACL::default()));
            repo.create(new_merchant).unwrap();
            repo.set_status(merchant_id.clone(), MerchantStatus::PendingDocuments, MerchantStatus::PendingReview)
                .unwrap();

            // the second transition still expects pending_documents
            let err = repo
                .set_status(merchant_id, MerchantStatus::PendingDocuments, MerchantStatus::PendingReview)
                .unwrap_err();
            match authorization_lib::http::errors::find_in_chain::<authorization_lib::errors::Error>(&err) {
                Some(&authorization_lib::errors::Error::ConcurrentModification) => {}
                other => panic!("Expected ConcurrentModification, got {:?}", other),
            }
        }
    });
}
