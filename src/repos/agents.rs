//! Repo for agents table. Agent rows come into existence through
//! `get_or_create`, an upsert keyed on the external identity subject so
//! two racing first sign-ins produce exactly one row.

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
use models::{Agent, AgentId, NewAgent, UserId};
use schema::agents::dsl::*;

pub trait AgentsRepo {
    /// Returns agent by id
    fn get(&self, agent_id: AgentId) -> RepoResult<Option<Agent>>;

    /// Idempotent provisioning keyed on the external identity subject
    fn get_or_create(&self, payload: NewAgent) -> RepoResult<Agent>;
}

pub struct AgentsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Agent>>,
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> AgentsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T, acl: Box<Acl<Resource, Action, Scope, FailureError, Agent>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> AgentsRepo for AgentsRepoImpl<'a, T> {
    fn get(&self, agent_id: AgentId) -> RepoResult<Option<Agent>> {
        debug!("Returns agent {} from db.", agent_id);
        agents
            .filter(id.eq(agent_id.clone()))
            .get_result::<Agent>(self.db_conn)
            .optional()
            .map_err(From::from)
            .and_then(|agent| {
                if let Some(ref agent) = agent {
                    acl::check(&*self.acl, Resource::Agent, Action::Read, self, Some(agent))?;
                }
                Ok(agent)
            })
            .map_err(|e: FailureError| e.context(format!("Get agent {} error occured", agent_id)).into())
    }

    fn get_or_create(&self, payload: NewAgent) -> RepoResult<Agent> {
        debug!("Get or create agent {} in db.", payload);
        let subject = payload.external_subject().to_string();
        diesel::insert_into(agents)
            .values(&payload)
            .on_conflict(external_subject)
            .do_nothing()
            .execute(self.db_conn)
            .map_err(FailureError::from)
            .and_then(|_| {
                agents
                    .filter(external_subject.eq(subject.clone()))
                    .get_result::<Agent>(self.db_conn)
                    .map_err(From::from)
            })
            .and_then(|agent| {
                acl::check(&*self.acl, Resource::Agent, Action::Write, self, Some(&agent))?;
                Ok(agent)
            })
            .map_err(|e: FailureError| e.context(format!("Get or create agent for subject {} error occured", subject)).into())
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> CheckScope<Scope, Agent>
    for AgentsRepoImpl<'a, T>
{
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&Agent>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}
