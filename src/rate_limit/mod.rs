//! Per-tenant token bucket rate limiting. The bucket state is ephemeral
//! by design: it lives in redis so limiting is global across service
//! instances, and losing it degrades to "fully refilled", never to
//! locked out tenants.

pub mod bucket;
pub mod local;
pub mod redis;

pub use self::bucket::{Admission, RatePolicy, TokenBucket};
pub use self::local::LocalRateLimiter;
pub use self::redis::RedisRateLimiter;

use failure::Error as FailureError;
use futures::Future;

use models::{TenantId, TenantKind};

pub trait RateLimiter: Send + Sync + 'static {
    /// Consumes `cost` tokens from the tenant's bucket; fails with
    /// `RateLimitExceeded` carrying a retry-after hint when the bucket
    /// cannot cover the cost
    fn admit(&self, tenant: TenantId, kind: TenantKind, cost: u32) -> Box<Future<Item = (), Error = FailureError> + Send>;
}
