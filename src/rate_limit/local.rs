//! In-process rate limiter for single instance deployments and tests.
//! Same bucket math as the redis limiter, without the shared store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use failure::Error as FailureError;
use failure::Fail;
use futures::future;
use futures::Future;

use super::bucket::{Admission, TokenBucket};
use super::RateLimiter;
use config::RateLimits;
use errors::Error;
use models::{TenantId, TenantKind};

#[derive(Clone)]
pub struct LocalRateLimiter {
    limits: RateLimits,
    buckets: Arc<Mutex<HashMap<TenantId, TokenBucket>>>,
}

impl LocalRateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Clock-injected variant driving the trait impl; tests call this
    /// directly with a synthetic clock
    pub fn check_at(&self, tenant: &TenantId, kind: TenantKind, cost: u32, now_ms: u64) -> Admission {
        let policy = self.limits.policy_for(kind);
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets
            .entry(tenant.clone())
            .or_insert_with(|| TokenBucket::full(&policy, now_ms));
        bucket.consume(&policy, now_ms, cost)
    }
}

impl RateLimiter for LocalRateLimiter {
    fn admit(&self, tenant: TenantId, kind: TenantKind, cost: u32) -> Box<Future<Item = (), Error = FailureError> + Send> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis()))
            .unwrap_or(0);

        match self.check_at(&tenant, kind, cost, now_ms) {
            Admission::Admitted => Box::new(future::ok(())),
            Admission::Denied { retry_after_ms } => {
                debug!("Rate limit exceeded for tenant {}", tenant);
                Box::new(future::err(
                    Error::RateLimitExceeded { retry_after_ms }
                        .context(format!("Tenant {} exhausted its bucket", tenant))
                        .into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::MerchantId;
    use rate_limit::bucket::RatePolicy;

    fn limits() -> RateLimits {
        RateLimits {
            merchant: RatePolicy {
                capacity: 3,
                refill_per_sec: 1.0,
            },
            agent: RatePolicy {
                capacity: 1,
                refill_per_sec: 0.5,
            },
        }
    }

    fn merchant_tenant() -> TenantId {
        TenantId::Merchant(MerchantId::new())
    }

    #[test]
    fn tenants_get_independent_buckets() {
        let limiter = LocalRateLimiter::new(limits());
        let first = merchant_tenant();
        let second = merchant_tenant();

        for _ in 0..3 {
            assert_eq!(limiter.check_at(&first, TenantKind::Merchant, 1, 0), Admission::Admitted);
        }
        assert!(limiter.check_at(&first, TenantKind::Merchant, 1, 0) != Admission::Admitted);

        // exhausting `first` does not touch `second`
        assert_eq!(limiter.check_at(&second, TenantKind::Merchant, 1, 0), Admission::Admitted);
    }

    #[test]
    fn tiers_have_separate_policies() {
        let limiter = LocalRateLimiter::new(limits());
        let agent = TenantId::Agent("agent_cafe".parse().unwrap());

        assert_eq!(limiter.check_at(&agent, TenantKind::Agent, 1, 0), Admission::Admitted);
        match limiter.check_at(&agent, TenantKind::Agent, 1, 0) {
            Admission::Denied { retry_after_ms } => assert_eq!(retry_after_ms, 2_000),
            other => panic!("Expected denial, got {:?}", other),
        }
    }

    #[test]
    fn admit_surfaces_rate_limit_error() {
        use http::errors::find_in_chain;

        let limiter = LocalRateLimiter::new(limits());
        let tenant = merchant_tenant();
        for _ in 0..3 {
            limiter.admit(tenant.clone(), TenantKind::Merchant, 1).wait().unwrap();
        }
        let err = limiter.admit(tenant, TenantKind::Merchant, 1).wait().unwrap_err();
        match find_in_chain::<Error>(&err) {
            Some(&Error::RateLimitExceeded { .. }) => {}
            other => panic!("Expected RateLimitExceeded, got {:?}", other),
        }
    }
}
