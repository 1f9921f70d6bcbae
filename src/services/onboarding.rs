//! Onboarding service drives a merchant through the kyb workflow:
//! registration, document collection, review, psp linkage and soft
//! delete. Every transition is compare-and-swap guarded in the repo, so
//! concurrent reviewer actions surface as `ConcurrentModification`
//! instead of silently double-applying.

use chrono::Utc;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;
use futures::future;
use futures::Future;
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use models::*;
use repos::repo_factory::ReposFactory;
use services::Service;

pub trait OnboardingService {
    /// Creates a merchant in `pending_documents`
    fn submit_registration(&self, payload: NewMerchantPayload) -> ServiceFuture<Merchant>;

    /// Merchant with its uploaded documents, employee portal view
    fn get_merchant(&self, merchant_id: MerchantId) -> ServiceFuture<MerchantWithDocuments>;

    /// Appends a kyb document; auto-advances to `pending_review` once
    /// every required type is present
    fn upload_document(&self, merchant_id: MerchantId, payload: UploadDocumentPayload) -> ServiceFuture<Merchant>;

    /// Reviewer verdict: approve to `pending_psp` or reject with reason
    fn review(&self, merchant_id: MerchantId, payload: ReviewPayload) -> ServiceFuture<Merchant>;

    /// Explicit re-entry of a rejected merchant into `pending_documents`
    fn reset(&self, merchant_id: MerchantId) -> ServiceFuture<Merchant>;

    /// Verifies the credential against the provider and, on success,
    /// activates the merchant and issues its first api key
    fn connect_psp(&self, merchant_id: MerchantId, payload: ConnectPspPayload) -> ServiceFuture<ActivatedMerchant>;

    /// Soft delete: revokes every key, keeps the rows
    fn delete(&self, merchant_id: MerchantId) -> ServiceFuture<Merchant>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > OnboardingService for Service<T, M, F>
{
    fn submit_registration(&self, payload: NewMerchantPayload) -> ServiceFuture<Merchant> {
        debug!("Registering merchant '{}'", payload.legal_name);
        if let Err(errors) = payload.validate() {
            return Box::new(future::err(
                Error::Validate(errors).context("Merchant registration payload is invalid").into(),
            ));
        }

        let repo_factory = self.static_context.repo_factory.clone();
        let new_merchant = NewMerchant::new(payload);

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
            merchants_repo
                .create(new_merchant)
                .map_err(|e: FailureError| e.context("Service onboarding, submit_registration endpoint error occured.").into())
        })
    }

    fn get_merchant(&self, merchant_id: MerchantId) -> ServiceFuture<MerchantWithDocuments> {
        let current_uid = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo(&*conn, current_uid);
            let documents_repo = repo_factory.create_merchant_documents_repo_with_sys_acl(&*conn);
            merchants_repo
                .get(merchant_id.clone())
                .and_then(|merchant| merchant.ok_or_else(|| Error::NotFound.into()))
                .and_then(|merchant| {
                    let documents = documents_repo.list_for_merchant(merchant_id.clone())?;
                    Ok(MerchantWithDocuments { merchant, documents })
                })
                .map_err(|e: FailureError| e.context("Service onboarding, get_merchant endpoint error occured.").into())
        })
    }

    fn upload_document(&self, merchant_id: MerchantId, payload: UploadDocumentPayload) -> ServiceFuture<Merchant> {
        debug!("Uploading {} document for merchant {}", payload.document_type, merchant_id);
        if let Err(errors) = payload.validate() {
            return Box::new(future::err(
                Error::Validate(errors).context("Document upload payload is invalid").into(),
            ));
        }

        let repo_factory = self.static_context.repo_factory.clone();
        let required = self.static_context.config.onboarding.required_documents.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
            let documents_repo = repo_factory.create_merchant_documents_repo_with_sys_acl(&*conn);
            conn.transaction::<Merchant, FailureError, _>(move || {
                let merchant = merchants_repo
                    .get(merchant_id.clone())?
                    .ok_or(Error::NotFound)?;
                if !merchant.status.accepts_documents() {
                    return Err(Error::InvalidState
                        .context(format!(
                            "Merchant {} in status {} does not accept documents",
                            merchant.id, merchant.status
                        ))
                        .into());
                }

                documents_repo.create(NewMerchantDocument::new(
                    merchant_id.clone(),
                    payload.document_type,
                    payload.blob_ref.clone(),
                ))?;

                let uploaded = documents_repo.list_for_merchant(merchant_id.clone())?;
                let satisfied = required
                    .iter()
                    .all(|required_type| uploaded.iter().any(|document| document.document_type == *required_type));

                if merchant.status == MerchantStatus::PendingDocuments && satisfied {
                    merchants_repo.set_status(merchant_id.clone(), MerchantStatus::PendingDocuments, MerchantStatus::PendingReview)
                } else {
                    // duplicate uploads of a satisfied type are no-ops on state
                    Ok(merchant)
                }
            }).map_err(|e: FailureError| e.context("Service onboarding, upload_document endpoint error occured.").into())
        })
    }

    fn review(&self, merchant_id: MerchantId, payload: ReviewPayload) -> ServiceFuture<Merchant> {
        debug!("Reviewing merchant {}: {:?}", merchant_id, payload.decision);
        let current_uid = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo(&*conn, current_uid);
            let merchant = merchants_repo
                .get(merchant_id.clone())?
                .ok_or(Error::NotFound)?;
            if merchant.status != MerchantStatus::PendingReview {
                return Err(Error::InvalidState
                    .context(format!("Merchant {} in status {} is not reviewable", merchant.id, merchant.status))
                    .into());
            }

            match payload.decision {
                ReviewDecision::Approve => {
                    merchants_repo.set_status(merchant_id.clone(), MerchantStatus::PendingReview, MerchantStatus::PendingPsp)
                }
                ReviewDecision::Reject => {
                    let reason = payload.reason.unwrap_or_else(|| "Rejected by reviewer".to_string());
                    merchants_repo.set_status_rejected(merchant_id.clone(), MerchantStatus::PendingReview, reason)
                }
            }.map_err(|e: FailureError| e.context("Service onboarding, review endpoint error occured.").into())
        })
    }

    fn reset(&self, merchant_id: MerchantId) -> ServiceFuture<Merchant> {
        debug!("Resetting rejected merchant {}", merchant_id);
        if !self.static_context.config.onboarding.allow_rejected_reset {
            return Box::new(future::err(
                Error::Forbidden.context("Rejected merchants may not re-enter onboarding").into(),
            ));
        }

        let current_uid = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo(&*conn, current_uid);
            let merchant = merchants_repo
                .get(merchant_id.clone())?
                .ok_or(Error::NotFound)?;
            if merchant.status != MerchantStatus::Rejected {
                return Err(Error::InvalidState
                    .context(format!("Merchant {} in status {} cannot be reset", merchant.id, merchant.status))
                    .into());
            }

            merchants_repo
                .set_status(merchant_id.clone(), MerchantStatus::Rejected, MerchantStatus::PendingDocuments)
                .map_err(|e: FailureError| e.context("Service onboarding, reset endpoint error occured.").into())
        })
    }

    fn connect_psp(&self, merchant_id: MerchantId, payload: ConnectPspPayload) -> ServiceFuture<ActivatedMerchant> {
        debug!("Connecting {} for merchant {}", payload.provider, merchant_id);
        if let Err(errors) = payload.validate() {
            return Box::new(future::err(
                Error::Validate(errors).context("Psp connection payload is invalid").into(),
            ));
        }

        let service = self.clone();
        let repo_factory = self.static_context.repo_factory.clone();
        let psp_verifier = self.static_context.psp_verifier.clone();
        let visible_len = self.static_context.config.keys.display_prefix_len;
        let provider = payload.provider;
        let credential = PspCredential::new(payload.credential);
        let merchant_id_check = merchant_id.clone();

        // the status precondition is checked before the network call, but
        // the transition itself is compare-and-swapped only after the
        // verifier returns - no lock is held across the psp roundtrip
        let fut = self
            .spawn_on_pool(move |conn| {
                let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
                let merchant = merchants_repo
                    .get(merchant_id_check.clone())?
                    .ok_or(Error::NotFound)?;
                if merchant.status != MerchantStatus::PendingPsp {
                    return Err(Error::InvalidState
                        .context(format!(
                            "Merchant {} in status {} is not awaiting psp linkage",
                            merchant.id, merchant.status
                        ))
                        .into());
                }
                Ok(())
            })
            .and_then(move |_| {
                psp_verifier.verify(provider, credential).then(|result| match result {
                    Ok(ref outcome) if outcome.valid => Ok(()),
                    Ok(outcome) => {
                        let reason = outcome.reason.unwrap_or_else(|| "Credential rejected by provider".to_string());
                        Err(Error::PspVerification(reason)
                            .context("Psp verifier rejected the credential")
                            .into())
                    }
                    Err(e) => Err(e.context(Error::HttpClient).into()),
                })
            })
            .and_then(move |_| {
                let repo_factory = service.static_context.repo_factory.clone();
                service.spawn_on_pool(move |conn| {
                    let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
                    let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);
                    let verified_at = Utc::now().naive_utc();
                    conn.transaction::<ActivatedMerchant, FailureError, _>(move || {
                        let merchant = merchants_repo.set_status_active_with_psp(
                            merchant_id.clone(),
                            MerchantStatus::PendingPsp,
                            provider,
                            verified_at,
                        )?;
                        let (new_key, raw) = NewApiKey::generate(TenantId::Merchant(merchant.id.clone()), visible_len)?;
                        let key = api_keys_repo.create(new_key)?;
                        info!("Merchant {} activated with {} binding, issued first api key {}", merchant.id, provider, key.id);
                        Ok(ActivatedMerchant {
                            merchant,
                            api_key: IssuedApiKey::new(key, raw),
                        })
                    })
                })
            })
            .map_err(|e: FailureError| e.context("Service onboarding, connect_psp endpoint error occured.").into());

        Box::new(fut)
    }

    fn delete(&self, merchant_id: MerchantId) -> ServiceFuture<Merchant> {
        debug!("Soft deleting merchant {}", merchant_id);
        let current_uid = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo(&*conn, current_uid);
            let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);
            conn.transaction::<Merchant, FailureError, _>(move || {
                let merchant = merchants_repo.soft_delete(merchant_id.clone())?;
                let revoked = api_keys_repo.revoke_all_for_tenant(TenantId::Merchant(merchant_id.clone()))?;
                info!("Merchant {} soft deleted, revoked {} api keys", merchant_id, revoked.len());
                Ok(merchant)
            }).map_err(|e: FailureError| e.context("Service onboarding, delete endpoint error occured.").into())
        })
    }
}
