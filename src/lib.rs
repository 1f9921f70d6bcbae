//! Authorization is a microservice responsible for merchant onboarding
//! and api key authorization for the whole platform.
//! The layered structure of the app is
//!
//! `Application -> Controller -> Service -> Repo + Client`
//!
//! Each layer can only face exceptions in its base layers and can only expose its own errors.
//! E.g. `Service` layer will only deal with `Repo` and `Client` errors and will only return
//! `ServiceError`. That way Controller will only have to deal with ServiceError, but not with `Repo`
//! or `Client` errors.

extern crate base64;
extern crate bigdecimal;
extern crate chrono;
extern crate config as config_crate;
#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate enum_iterator;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate hex;
extern crate hyper;
extern crate hyper_tls;
extern crate jsonwebtoken;
#[macro_use]
extern crate log;
extern crate r2d2;
extern crate r2d2_diesel;
extern crate r2d2_redis;
extern crate rand;
extern crate regex;
extern crate sentry;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate sha2;
extern crate subtle;
extern crate tokio_core;
extern crate tokio_signal;
extern crate tokio_timer;
extern crate uuid;
extern crate validator;
#[macro_use]
extern crate validator_derive;

#[macro_use]
pub mod macros;
pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod http;
pub mod models;
pub mod rate_limit;
pub mod repos;
pub mod schema;
pub mod sentry_integration;
pub mod services;

use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use diesel::pg::PgConnection;
use futures::{Future, Stream};
use futures_cpupool::CpuPool;
use hyper::server::Http;
use r2d2_diesel::ConnectionManager;
use r2d2_redis::RedisConnectionManager;
use tokio_core::reactor::Core;
use tokio_timer::Interval;

use client::psp::{HttpPspVerifier, PspVerifier};
use config::Config;
use controller::context::StaticContext;
use errors::Error;
use http::Application;
use rate_limit::{LocalRateLimiter, RateLimiter, RedisRateLimiter};
use repos::acl::RolesCacheImpl;
use repos::repo_factory::ReposFactoryImpl;

/// How often degraded-mode counters are surfaced in the logs
const METRICS_INTERVAL_SECS: u64 = 60;

/// Starts new web service from provided `Config`
pub fn start_server<F: FnOnce() + 'static>(config: Config, port: &Option<String>, callback: F) {
    // Prepare reactor
    let mut core = Core::new().expect("Unexpected error creating event loop core");
    let handle = Arc::new(core.handle());

    let client = http::client::Client::new(&config.to_http_config(), &handle);
    let client_handle = client.handle();
    let client_stream = client.stream();
    handle.spawn(client_stream.for_each(|_| Ok(())));

    // Prepare server
    let thread_count = config.server.thread_count;
    let address = {
        let port = port.as_ref().unwrap_or(&config.server.port);
        format!("{}:{}", config.server.host, port).parse().expect("Could not parse address")
    };

    // Prepare database pool
    let database_url: String = config.server.database.parse().expect("Database URL must be set in configuration");
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let db_pool = r2d2::Pool::builder().build(manager).expect("Failed to create connection pool");

    // Prepare CPU pool
    let cpu_pool = CpuPool::new(thread_count);

    let roles_cache = RolesCacheImpl::default();
    let repo_factory = ReposFactoryImpl::new(roles_cache.clone());

    let psp_verifier: Arc<dyn PspVerifier> = Arc::new(HttpPspVerifier::new(
        client_handle.clone(),
        client::psp::Config::from(config.psp.clone()),
    ));

    // The rate limiter store is checked lazily so a redis outage at boot
    // does not take the service down with it
    let rate_limiter: Arc<dyn RateLimiter> = match config.redis.clone() {
        Some(redis_config) => {
            let redis_manager = RedisConnectionManager::new(redis_config.url.as_str()).expect("Invalid redis url");
            let redis_pool = r2d2::Pool::builder().build_unchecked(redis_manager);
            Arc::new(RedisRateLimiter::new(redis_pool, cpu_pool.clone(), config.rate_limits.clone()))
        }
        None => {
            warn!("No redis configured, rate limiting degrades to per-process buckets");
            Arc::new(LocalRateLimiter::new(config.rate_limits.clone()))
        }
    };

    let static_context = StaticContext::new(
        db_pool,
        cpu_pool,
        Arc::new(config),
        repo_factory,
        roles_cache,
        psp_verifier,
        rate_limiter,
    );

    // Periodic visibility into the fire-and-forget parts of the gateway
    let usage_metrics = static_context.usage_metrics.clone();
    let metrics_log = Interval::new(Instant::now(), Duration::from_secs(METRICS_INTERVAL_SECS))
        .map_err(|e| warn!("Metrics timer failed: {}", e))
        .for_each(move |_| {
            let dropped = usage_metrics.dropped_records.load(Ordering::Relaxed);
            if dropped > 0 {
                warn!("Usage ledger writes dropped so far: {}", dropped);
            }
            Ok(())
        });
    handle.spawn(metrics_log);

    let serve = Http::new()
        .serve_addr_handle(&address, &handle, move || {
            let controller = controller::ControllerImpl::new(static_context.clone());

            // Prepare application
            let app = Application::<Error>::new(controller);

            Ok(app)
        })
        .unwrap_or_else(|why| {
            error!("Http Server Initialization Error: {}", why);
            process::exit(1);
        });

    let handle_arc2 = handle.clone();
    handle.spawn(
        serve
            .for_each(move |conn| {
                handle_arc2.spawn(conn.map(|_| ()).map_err(|why| error!("Server Error: {:?}", why)));
                Ok(())
            })
            .map_err(|_| ()),
    );

    info!("Listening on http://{}, threads: {}", address, thread_count);
    handle.spawn_fn(move || {
        callback();
        futures::future::ok(())
    });

    core.run(tokio_signal::ctrl_c().flatten_stream().take(1u64).for_each(|()| {
        info!("Ctrl+C received. Exit");

        Ok(())
    })).unwrap();
}
