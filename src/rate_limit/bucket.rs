//! Pure token bucket arithmetic, shared by the local limiter and kept in
//! lockstep with the redis lua script.

/// Per tenant tier policy: burst capacity and sustained refill rate
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RatePolicy {
    pub capacity: u32,
    pub refill_per_sec: f64,
}

impl RatePolicy {
    /// How long a completely drained bucket takes to fill back up
    pub fn full_refill_ms(&self) -> u64 {
        (f64::from(self.capacity) / self.refill_per_sec.max(::std::f64::EPSILON) * 1000.0).ceil() as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    Admitted,
    Denied { retry_after_ms: u64 },
}

#[derive(Clone, Copy, Debug)]
pub struct TokenBucket {
    tokens: f64,
    refreshed_at_ms: u64,
}

impl TokenBucket {
    /// A fresh bucket starts full - restarts never lock tenants out
    pub fn full(policy: &RatePolicy, now_ms: u64) -> Self {
        TokenBucket {
            tokens: f64::from(policy.capacity),
            refreshed_at_ms: now_ms,
        }
    }

    pub fn consume(&mut self, policy: &RatePolicy, now_ms: u64, cost: u32) -> Admission {
        let elapsed_ms = now_ms.saturating_sub(self.refreshed_at_ms);
        let refilled = elapsed_ms as f64 / 1000.0 * policy.refill_per_sec;
        self.tokens = (self.tokens + refilled).min(f64::from(policy.capacity));
        self.refreshed_at_ms = now_ms;

        let cost = f64::from(cost);
        if self.tokens >= cost {
            self.tokens -= cost;
            Admission::Admitted
        } else {
            let missing = cost - self.tokens;
            let retry_after_ms = (missing / policy.refill_per_sec.max(::std::f64::EPSILON) * 1000.0).ceil() as u64;
            Admission::Denied { retry_after_ms }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RatePolicy {
        RatePolicy {
            capacity: 10,
            refill_per_sec: 2.0,
        }
    }

    #[test]
    fn fresh_bucket_admits_a_full_burst_and_no_more() {
        let policy = policy();
        let mut bucket = TokenBucket::full(&policy, 0);

        for _ in 0..10 {
            assert_eq!(bucket.consume(&policy, 0, 1), Admission::Admitted);
        }
        match bucket.consume(&policy, 0, 1) {
            Admission::Denied { retry_after_ms } => assert_eq!(retry_after_ms, 500),
            other => panic!("Expected denial, got {:?}", other),
        }
    }

    #[test]
    fn bucket_refills_at_the_configured_rate() {
        let policy = policy();
        let mut bucket = TokenBucket::full(&policy, 0);

        for _ in 0..10 {
            bucket.consume(&policy, 0, 1);
        }
        // 2 tokens/s -> one second buys two calls
        assert_eq!(bucket.consume(&policy, 1_000, 1), Admission::Admitted);
        assert_eq!(bucket.consume(&policy, 1_000, 1), Admission::Admitted);
        assert!(bucket.consume(&policy, 1_000, 1) != Admission::Admitted);
    }

    #[test]
    fn bucket_never_exceeds_capacity() {
        let policy = policy();
        let mut bucket = TokenBucket::full(&policy, 0);

        // idle for an hour - still only `capacity` tokens available
        let now = 3_600_000;
        let mut admitted = 0;
        while bucket.consume(&policy, now, 1) == Admission::Admitted {
            admitted += 1;
        }
        assert_eq!(admitted, 10);
    }

    #[test]
    fn retry_after_covers_the_missing_tokens() {
        let policy = policy();
        let mut bucket = TokenBucket::full(&policy, 0);
        bucket.consume(&policy, 0, 10);

        match bucket.consume(&policy, 0, 4) {
            Admission::Denied { retry_after_ms } => assert_eq!(retry_after_ms, 2_000),
            other => panic!("Expected denial, got {:?}", other),
        }
    }

    #[test]
    fn no_more_than_capacity_within_any_short_window() {
        let policy = policy();
        let mut bucket = TokenBucket::full(&policy, 0);

        // sweep a window shorter than capacity/refill seconds
        let window_ms = 4_000; // capacity/refill = 5s
        let mut admitted = 0;
        for ms in 0..window_ms {
            if bucket.consume(&policy, ms, 1) == Admission::Admitted {
                admitted += 1;
            }
        }
        // capacity plus what refilled during the window
        let refilled = (window_ms as f64 / 1000.0 * policy.refill_per_sec) as u64;
        assert!(admitted <= u64::from(policy.capacity) + refilled);
    }
}
