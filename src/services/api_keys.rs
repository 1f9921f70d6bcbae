//! Api keys service: issuing, authenticating, revoking and rotating
//! keys for merchants and agents. Only the sha-256 hash of a secret is
//! ever stored; authentication re-hashes the presented value and
//! compares in constant time.

use base64;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;
use jsonwebtoken::{self, Algorithm, Validation};
use r2d2::ManageConnection;

use super::types::ServiceFuture;
use errors::Error;
use models::*;
use repos::repo_factory::ReposFactory;
use repos::{AgentsRepo, MerchantsRepo};
use services::Service;

pub trait ApiKeysService {
    /// Issues a key for an eligible tenant, returning the secret once
    fn issue(&self, tenant_id: TenantId) -> ServiceFuture<IssuedApiKey>;

    /// Resolves a presented secret to the owning tenant context
    fn authenticate(&self, bearer: String) -> ServiceFuture<TenantContext>;

    /// Idempotent revocation of one key
    fn revoke(&self, key_id: ApiKeyId) -> ServiceFuture<ApiKey>;

    /// Revokes every live key of the tenant and issues the replacement
    /// in one transaction - no window with two valid key sets
    fn rotate(&self, tenant_id: TenantId) -> ServiceFuture<IssuedApiKey>;
}

/// Claims accepted on the deprecated legacy token path
#[derive(Debug, Deserialize)]
struct LegacyTokenClaims {
    sub: String,
    #[allow(dead_code)]
    exp: u64,
}

fn decode_legacy_token(token: &str, public_key_base64: &str) -> Option<TenantId> {
    let der = base64::decode(public_key_base64).ok()?;
    let validation = Validation::new(Algorithm::RS256);
    let data = jsonwebtoken::decode::<LegacyTokenClaims>(token, &der, &validation).ok()?;
    data.claims.sub.parse().ok()
}

/// A key only authenticates while its owner is live: active merchants
/// and active agents. Everything else reads as an invalid key so account
/// state is not leaked to key holders.
fn ensure_live_owner(
    merchants_repo: &MerchantsRepo,
    agents_repo: &AgentsRepo,
    tenant_id: &TenantId,
) -> Result<(), FailureError> {
    let live = match *tenant_id {
        TenantId::Merchant(ref merchant_id) => merchants_repo
            .get(merchant_id.clone())?
            .map(|merchant| merchant.status == MerchantStatus::Active && merchant.deleted_at.is_none())
            .unwrap_or(false),
        TenantId::Agent(ref agent_id) => agents_repo
            .get(agent_id.clone())?
            .map(|agent| agent.is_active)
            .unwrap_or(false),
    };

    if live {
        Ok(())
    } else {
        Err(Error::InvalidKey
            .context(format!("Owner {} of the presented key is not live", tenant_id))
            .into())
    }
}

fn ensure_eligible(
    merchants_repo: &MerchantsRepo,
    agents_repo: &AgentsRepo,
    tenant_id: &TenantId,
) -> Result<(), FailureError> {
    let eligible = match *tenant_id {
        TenantId::Merchant(ref merchant_id) => merchants_repo
            .get(merchant_id.clone())?
            .ok_or(Error::NotFound)?
            .status == MerchantStatus::Active,
        TenantId::Agent(ref agent_id) => agents_repo.get(agent_id.clone())?.ok_or(Error::NotFound)?.is_active,
    };

    if eligible {
        Ok(())
    } else {
        Err(Error::TenantNotEligible
            .context(format!("Tenant {} is not in an authorizable state", tenant_id))
            .into())
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > ApiKeysService for Service<T, M, F>
{
    fn issue(&self, tenant_id: TenantId) -> ServiceFuture<IssuedApiKey> {
        debug!("Issuing api key for tenant {}", tenant_id);
        let repo_factory = self.static_context.repo_factory.clone();
        let visible_len = self.static_context.config.keys.display_prefix_len;

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
            let agents_repo = repo_factory.create_agents_repo_with_sys_acl(&*conn);
            let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);

            ensure_eligible(&*merchants_repo, &*agents_repo, &tenant_id)
                .and_then(|_| NewApiKey::generate(tenant_id.clone(), visible_len))
                .and_then(|(new_key, raw)| {
                    let key = api_keys_repo.create(new_key)?;
                    info!("Issued api key {} for tenant {}", key.id, tenant_id);
                    Ok(IssuedApiKey::new(key, raw))
                })
                .map_err(|e: FailureError| e.context("Service api_keys, issue endpoint error occured.").into())
        })
    }

    fn authenticate(&self, bearer: String) -> ServiceFuture<TenantContext> {
        let repo_factory = self.static_context.repo_factory.clone();
        let visible_len = self.static_context.config.keys.display_prefix_len;
        let legacy_public_key = self.static_context.config.keys.legacy_token_public_key_base64.clone();

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
            let agents_repo = repo_factory.create_agents_repo_with_sys_acl(&*conn);
            let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);

            if let Some(prefix) = RawApiKey::display_prefix(&bearer, visible_len) {
                let presented = KeyHash::digest(&bearer);
                let candidates = api_keys_repo.find_active_by_prefix(prefix)?;
                if let Some(key) = candidates.into_iter().find(|key| key.key_hash.ct_matches(&presented)) {
                    ensure_live_owner(&*merchants_repo, &*agents_repo, &key.tenant_id)?;
                    api_keys_repo.touch_last_used(key.id.clone())?;
                    return Ok(TenantContext::new(key.tenant_id));
                }
            }

            // deprecated fallback, tried only after the hash lookup missed
            if let Some(ref public_key) = legacy_public_key {
                if bearer.contains('.') {
                    if let Some(tenant_id) = decode_legacy_token(&bearer, public_key) {
                        warn!("Deprecated legacy token used by tenant {}", tenant_id);
                        ensure_live_owner(&*merchants_repo, &*agents_repo, &tenant_id)?;
                        return Ok(TenantContext::legacy(tenant_id));
                    }
                }
            }

            Err(Error::InvalidKey.context("Presented api key matched no tenant").into())
        })
    }

    fn revoke(&self, key_id: ApiKeyId) -> ServiceFuture<ApiKey> {
        debug!("Revoking api key {}", key_id);
        let repo_factory = self.static_context.repo_factory.clone();
        let caller = self.dynamic_context.tenant.clone();

        self.spawn_on_pool(move |conn| {
            let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);
            let key = api_keys_repo.get(key_id.clone())?.ok_or(Error::NotFound)?;

            // key holders may only touch their own keys; a foreign key id
            // reads as not found rather than leaking its existence
            if let Some(ref caller) = caller {
                if key.tenant_id != caller.tenant_id {
                    return Err(Error::NotFound
                        .context(format!("Key {} does not belong to the caller", key_id))
                        .into());
                }
            }

            api_keys_repo
                .revoke(key_id.clone())
                .map_err(|e: FailureError| e.context("Service api_keys, revoke endpoint error occured.").into())
        })
    }

    fn rotate(&self, tenant_id: TenantId) -> ServiceFuture<IssuedApiKey> {
        debug!("Rotating api keys of tenant {}", tenant_id);
        let repo_factory = self.static_context.repo_factory.clone();
        let visible_len = self.static_context.config.keys.display_prefix_len;

        self.spawn_on_pool(move |conn| {
            let merchants_repo = repo_factory.create_merchants_repo_with_sys_acl(&*conn);
            let agents_repo = repo_factory.create_agents_repo_with_sys_acl(&*conn);
            let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);

            conn.transaction::<IssuedApiKey, FailureError, _>(move || {
                ensure_eligible(&*merchants_repo, &*agents_repo, &tenant_id)?;
                let revoked = api_keys_repo.revoke_all_for_tenant(tenant_id.clone())?;
                let (new_key, raw) = NewApiKey::generate(tenant_id.clone(), visible_len)?;
                let key = api_keys_repo.create(new_key)?;
                info!("Rotated api keys of tenant {}: revoked {}, issued {}", tenant_id, revoked.len(), key.id);
                Ok(IssuedApiKey::new(key, raw))
            }).map_err(|e: FailureError| e.context("Service api_keys, rotate endpoint error occured.").into())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::Future;

    use client::psp::mock::MockPspVerifier;
    use errors::Error;
    use http::errors::find_in_chain;
    use models::*;
    use repos::repo_factory::tests::*;
    use services::ApiKeysService;

    fn service_with_active_agent() -> (
        ::services::Service<MockConnection, MockConnectionManager, ReposFactoryMock>,
        ReposFactoryMock,
        AgentId,
    ) {
        let repo_factory = ReposFactoryMock::default();
        let agent_id = {
            let mut store = repo_factory.store.lock().unwrap();
            let agent = Agent {
                id: AgentId::new(),
                external_subject: "agents-idp|7f2c".to_string(),
                display_name: "Restock bot".to_string(),
                contact_email: "bots@acme.example".to_string(),
                is_active: true,
                created_at: ::chrono::Utc::now().naive_utc(),
            };
            let agent_id = agent.id.clone();
            store.agents.insert(agent.id.clone(), agent);
            agent_id
        };
        let service = create_service(repo_factory.clone(), Arc::new(MockPspVerifier::default()), None, None);
        (service, repo_factory, agent_id)
    }

    fn expect_invalid_key(err: &::failure::Error) {
        match find_in_chain::<Error>(err) {
            Some(&Error::InvalidKey) => {}
            other => panic!("Expected InvalidKey, got {:?}", other),
        }
    }

    #[test]
    fn issued_key_authenticates_to_its_tenant() {
        let (service, _, agent_id) = service_with_active_agent();
        let tenant = TenantId::Agent(agent_id);

        let issued = service.issue(tenant.clone()).wait().unwrap();
        let context = service.authenticate(issued.secret).wait().unwrap();

        assert_eq!(context.tenant_id, tenant);
        assert_eq!(context.tenant_kind, TenantKind::Agent);
        assert!(!context.legacy);
        assert!(!context.scopes.is_empty());
    }

    #[test]
    fn issue_requires_an_eligible_tenant() {
        let (service, repo_factory, agent_id) = service_with_active_agent();
        {
            let mut store = repo_factory.store.lock().unwrap();
            store.agents.get_mut(&agent_id).unwrap().is_active = false;
        }

        let err = service.issue(TenantId::Agent(agent_id)).wait().unwrap_err();
        match find_in_chain::<Error>(&err) {
            Some(&Error::TenantNotEligible) => {}
            other => panic!("Expected TenantNotEligible, got {:?}", other),
        }
    }

    #[test]
    fn revoked_key_no_longer_authenticates_and_revoke_is_idempotent() {
        let (service, _, agent_id) = service_with_active_agent();
        let issued = service.issue(TenantId::Agent(agent_id)).wait().unwrap();

        let revoked = service.revoke(issued.id.clone()).wait().unwrap();
        assert!(revoked.is_revoked());

        let err = service.authenticate(issued.secret.clone()).wait().unwrap_err();
        expect_invalid_key(&err);

        // revoking again is a no-op success, not an error
        let again = service.revoke(issued.id.clone()).wait().unwrap();
        assert_eq!(again.revoked_at, revoked.revoked_at);
    }

    #[test]
    fn rotation_leaves_no_overlap_window() {
        let (service, _, agent_id) = service_with_active_agent();
        let tenant = TenantId::Agent(agent_id);

        let old = service.issue(tenant.clone()).wait().unwrap();
        let new = service.rotate(tenant.clone()).wait().unwrap();

        let err = service.authenticate(old.secret).wait().unwrap_err();
        expect_invalid_key(&err);

        let context = service.authenticate(new.secret).wait().unwrap();
        assert_eq!(context.tenant_id, tenant);
    }

    #[test]
    fn malformed_and_unknown_secrets_are_rejected() {
        let (service, _, _) = service_with_active_agent();

        for bearer in &["", "garbage", "sk_short", "sk_0000000000000000000000000000000000000000000000000000000000000000"] {
            let err = service.authenticate(bearer.to_string()).wait().unwrap_err();
            expect_invalid_key(&err);
        }
    }

    #[test]
    fn tenant_cannot_revoke_a_foreign_key() {
        let (service, repo_factory, agent_id) = service_with_active_agent();
        let issued = service.issue(TenantId::Agent(agent_id)).wait().unwrap();

        let other_tenant = TenantContext::new(TenantId::Merchant(MerchantId::new()));
        let foreign_service = create_service(
            repo_factory,
            Arc::new(MockPspVerifier::default()),
            None,
            Some(other_tenant),
        );

        let err = foreign_service.revoke(issued.id).wait().unwrap_err();
        match find_in_chain::<Error>(&err) {
            Some(&Error::NotFound) => {}
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
