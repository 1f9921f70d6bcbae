//! Redis backed rate limiter shared by all service instances. Bucket
//! refill and consumption happen atomically inside a lua script, so
//! concurrent gateways cannot double-spend tokens.
//!
//! On redis or pool failure the limiter fails open: the call is admitted,
//! a warning is logged and the admission is counted so operators can
//! bound the outage budget. Rejecting all traffic on a cache outage is
//! worse than temporarily under-limiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use failure::Error as FailureError;
use failure::Fail;
use futures::Future;
use futures_cpupool::CpuPool;
use r2d2;
use r2d2_redis::redis::Script;
use r2d2_redis::RedisConnectionManager;

use super::RateLimiter;
use config::RateLimits;
use errors::Error;
use models::{TenantId, TenantKind};

const TOKEN_BUCKET_SCRIPT: &str = r#"
local tokens_key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_per_sec = tonumber(ARGV[2])
local now_ms = tonumber(ARGV[3])
local cost = tonumber(ARGV[4])
local ttl_ms = tonumber(ARGV[5])

local bucket = redis.call('HMGET', tokens_key, 'tokens', 'refreshed_at')
local tokens = tonumber(bucket[1])
local refreshed_at = tonumber(bucket[2])
if tokens == nil then
  tokens = capacity
  refreshed_at = now_ms
end

local elapsed_ms = math.max(0, now_ms - refreshed_at)
tokens = math.min(capacity, tokens + elapsed_ms / 1000 * refill_per_sec)

local allowed = 0
local retry_after_ms = 0
if tokens >= cost then
  tokens = tokens - cost
  allowed = 1
else
  retry_after_ms = math.ceil((cost - tokens) / refill_per_sec * 1000)
end

redis.call('HMSET', tokens_key, 'tokens', tokens, 'refreshed_at', now_ms)
redis.call('PEXPIRE', tokens_key, ttl_ms)
return {allowed, retry_after_ms}
"#;

pub struct RedisRateLimiter {
    pool: r2d2::Pool<RedisConnectionManager>,
    cpu_pool: CpuPool,
    limits: RateLimits,
    script: Arc<Script>,
    fail_open_admissions: Arc<AtomicU64>,
}

impl RedisRateLimiter {
    pub fn new(pool: r2d2::Pool<RedisConnectionManager>, cpu_pool: CpuPool, limits: RateLimits) -> Self {
        Self {
            pool,
            cpu_pool,
            limits,
            script: Arc::new(Script::new(TOKEN_BUCKET_SCRIPT)),
            fail_open_admissions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Admissions granted because the shared store was unreachable
    pub fn fail_open_admissions(&self) -> u64 {
        self.fail_open_admissions.load(Ordering::Relaxed)
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis()))
            .unwrap_or(0)
    }
}

impl RateLimiter for RedisRateLimiter {
    fn admit(&self, tenant: TenantId, kind: TenantKind, cost: u32) -> Box<Future<Item = (), Error = FailureError> + Send> {
        let pool = self.pool.clone();
        let script = self.script.clone();
        let policy = self.limits.policy_for(kind);
        let fail_open_admissions = self.fail_open_admissions.clone();

        Box::new(self.cpu_pool.spawn_fn(move || {
            let key = format!("rate:{}", tenant);
            let now_ms = Self::now_ms();

            let conn = match pool.get() {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Rate limiter store unreachable, failing open for tenant {}: {}", tenant, e);
                    fail_open_admissions.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
            };

            let outcome = script
                .key(key)
                .arg(policy.capacity)
                .arg(policy.refill_per_sec)
                .arg(now_ms)
                .arg(cost)
                .arg(policy.full_refill_ms())
                .invoke::<(i64, i64)>(&*conn);

            match outcome {
                Ok((1, _)) => Ok(()),
                Ok((_, retry_after_ms)) => {
                    debug!("Rate limit exceeded for tenant {}", tenant);
                    Err(Error::RateLimitExceeded {
                        retry_after_ms: retry_after_ms as u64,
                    }.context(format!("Tenant {} exhausted its bucket", tenant))
                        .into())
                }
                Err(e) => {
                    warn!("Rate limiter script failed, failing open for tenant {}: {}", tenant, e);
                    fail_open_admissions.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            }
        }))
    }
}
