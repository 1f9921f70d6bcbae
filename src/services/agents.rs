//! Agents service: explicit, idempotent provisioning of agent accounts
//! on a verified external identity assertion. The implicit
//! create-on-first-login of the portals is expressed as `get_or_create`
//! keyed on the assertion subject; racing first sign-ins converge on one
//! row.

use base64;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::Error as FailureError;
use failure::Fail;
use futures::future;
use jsonwebtoken::{self, Algorithm, Validation};
use r2d2::ManageConnection;
use validator::Validate;

use super::types::ServiceFuture;
use errors::Error;
use models::*;
use repos::repo_factory::ReposFactory;
use services::Service;

pub trait AgentsService {
    /// Verifies the identity assertion and provisions the agent account
    /// if absent; issues the first api key when the agent has none
    fn sign_in(&self, payload: AgentSignInPayload) -> ServiceFuture<AgentSession>;
}

fn decode_assertion(assertion: &str, public_key_base64: &str) -> Result<AgentIdentityClaims, FailureError> {
    let der = base64::decode(public_key_base64)
        .map_err(|e| FailureError::from(e).context("Agent identity public key is not valid base64"))?;
    let validation = Validation::new(Algorithm::RS256);
    jsonwebtoken::decode::<AgentIdentityClaims>(assertion, &der, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            FailureError::from(e)
                .context(Error::Forbidden)
                .context("Agent identity assertion failed verification")
                .into()
        })
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > AgentsService for Service<T, M, F>
{
    fn sign_in(&self, payload: AgentSignInPayload) -> ServiceFuture<AgentSession> {
        debug!("Agent sign-in");
        if let Err(errors) = payload.validate() {
            return Box::new(future::err(
                Error::Validate(errors).context("Agent sign-in payload is invalid").into(),
            ));
        }

        let public_key = match self.static_context.config.keys.agent_identity_public_key_base64 {
            Some(ref public_key) => public_key.clone(),
            None => {
                return Box::new(future::err(
                    Error::Forbidden.context("Agent sign-in is not configured on this deployment").into(),
                ))
            }
        };

        let claims = match decode_assertion(&payload.assertion, &public_key) {
            Ok(claims) => claims,
            Err(e) => return Box::new(future::err(e)),
        };

        let repo_factory = self.static_context.repo_factory.clone();
        let visible_len = self.static_context.config.keys.display_prefix_len;

        self.spawn_on_pool(move |conn| {
            let agents_repo = repo_factory.create_agents_repo_with_sys_acl(&*conn);
            let api_keys_repo = repo_factory.create_api_keys_repo_with_sys_acl(&*conn);

            conn.transaction::<AgentSession, FailureError, _>(move || {
                let agent = agents_repo.get_or_create(NewAgent::new(claims.sub, claims.name, claims.email))?;
                if !agent.is_active {
                    return Err(Error::TenantNotEligible
                        .context(format!("Agent {} is deactivated", agent.id))
                        .into());
                }

                let live_keys = api_keys_repo.list_active_for_tenant(TenantId::Agent(agent.id.clone()))?;
                let api_key = if live_keys.is_empty() {
                    let (new_key, raw) = NewApiKey::generate(TenantId::Agent(agent.id.clone()), visible_len)?;
                    let key = api_keys_repo.create(new_key)?;
                    info!("Provisioned agent {} with first api key {}", agent.id, key.id);
                    Some(IssuedApiKey::new(key, raw))
                } else {
                    None
                };

                Ok(AgentSession { agent, api_key })
            }).map_err(|e: FailureError| e.context("Service agents, sign_in endpoint error occured.").into())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::Future;

    use client::psp::mock::MockPspVerifier;
    use models::*;
    use repos::repo_factory::tests::*;
    use repos::repo_factory::ReposFactory;
    use repos::AgentsRepo;

    #[test]
    fn get_or_create_is_idempotent_per_subject() {
        let repo_factory = ReposFactoryMock::default();
        let conn = MockConnection::default();
        let repo = repo_factory.create_agents_repo_with_sys_acl(&conn);

        let first = repo
            .get_or_create(NewAgent::new(
                "agents-idp|7f2c".to_string(),
                "Restock bot".to_string(),
                "bots@acme.example".to_string(),
            ))
            .unwrap();
        let second = repo
            .get_or_create(NewAgent::new(
                "agents-idp|7f2c".to_string(),
                "Restock bot".to_string(),
                "bots@acme.example".to_string(),
            ))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo_factory.store.lock().unwrap().agents.len(), 1);
    }

    #[test]
    fn sign_in_requires_configured_identity_key() {
        use errors::Error;
        use http::errors::find_in_chain;
        use services::AgentsService;

        let service = create_service(ReposFactoryMock::default(), Arc::new(MockPspVerifier::default()), None, None);
        // base config ships without an agent identity key
        let err = service
            .sign_in(AgentSignInPayload {
                assertion: "header.payload.signature".to_string(),
            })
            .wait()
            .unwrap_err();
        match find_in_chain::<Error>(&err) {
            Some(&Error::Forbidden) => {}
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }
}
