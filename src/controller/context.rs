//! `Context` is a top level module contains static context and dynamic context for each request
use std::sync::Arc;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use futures_cpupool::CpuPool;
use r2d2::{ManageConnection, Pool};

use super::routes::*;
use client::psp::PspVerifier;
use config::Config;
use http::router::RouteParser;
use models::{TenantContext, UserId};
use rate_limit::RateLimiter;
use repos::acl::RolesCacheImpl;
use repos::repo_factory::*;
use services::usage::UsageMetrics;

/// Static context for all app
pub struct StaticContext<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub db_pool: Pool<M>,
    pub cpu_pool: CpuPool,
    pub config: Arc<Config>,
    pub route_parser: Arc<RouteParser<Route>>,
    pub repo_factory: F,
    pub roles_cache: RolesCacheImpl,
    pub psp_verifier: Arc<dyn PspVerifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub usage_metrics: Arc<UsageMetrics>,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > StaticContext<T, M, F>
{
    /// Create a new static context
    pub fn new(
        db_pool: Pool<M>,
        cpu_pool: CpuPool,
        config: Arc<Config>,
        repo_factory: F,
        roles_cache: RolesCacheImpl,
        psp_verifier: Arc<dyn PspVerifier>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let route_parser = Arc::new(create_route_parser());
        Self {
            db_pool,
            cpu_pool,
            config,
            route_parser,
            repo_factory,
            roles_cache,
            psp_verifier,
            rate_limiter,
            usage_metrics: Arc::new(UsageMetrics::default()),
        }
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Clone for StaticContext<T, M, F>
{
    fn clone(&self) -> Self {
        Self {
            db_pool: self.db_pool.clone(),
            cpu_pool: self.cpu_pool.clone(),
            config: self.config.clone(),
            route_parser: self.route_parser.clone(),
            repo_factory: self.repo_factory.clone(),
            roles_cache: self.roles_cache.clone(),
            psp_verifier: self.psp_verifier.clone(),
            rate_limiter: self.rate_limiter.clone(),
            usage_metrics: self.usage_metrics.clone(),
        }
    }
}

/// Dynamic context for each request: the acting portal user (if any) and
/// the authenticated api key tenant (if any)
#[derive(Clone)]
pub struct DynamicContext {
    pub user_id: Option<UserId>,
    pub tenant: Option<TenantContext>,
    pub correlation_token: String,
}

impl DynamicContext {
    /// Create a new dynamic context for each request
    pub fn new(user_id: Option<UserId>, tenant: Option<TenantContext>, correlation_token: String) -> Self {
        Self {
            user_id,
            tenant,
            correlation_token,
        }
    }
}
