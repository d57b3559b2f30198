//! A single shared rate gate for the blockchain node RPC client.
//!
//! The auditor's simulator and ingestion pipeline both issue JSON-RPC calls through the
//! same underlying node, so the gate has to be a first-class, shareable type rather than
//! a per-call sleep: adding worker tasks must never raise the aggregate request rate.
//! The client only ever builds this gate from a `calls_per_minute` budget, so the type is
//! concrete rather than generic over the clock/state/middleware governor supports.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::num::NonZeroU32;
use std::sync::Arc;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware<<DefaultClock as governor::clock::Clock>::Instant>>;

#[derive(Clone)]
pub struct RpcRateLimiter {
    rate_limiter: Arc<Limiter>,
}

impl RpcRateLimiter {
    const BURST_SIZE: NonZeroU32 = NonZeroU32::new(1).unwrap();

    /// Builds a gate from the configured `calls_per_minute` budget. A call may begin only
    /// once `60 / calls_per_minute` seconds have elapsed since the previous call began.
    pub fn per_minute(calls_per_minute: NonZeroU32) -> Self {
        let quota = Quota::per_minute(calls_per_minute).allow_burst(Self::BURST_SIZE);
        Self {
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RpcRateLimiter {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        // every RPC method begins only once a token is available; this is the
        // only point in the client where the shared rate budget is enforced.
        self.rate_limiter.until_ready().await;
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn per_minute_spaces_out_permits() {
        let limiter = RpcRateLimiter::per_minute(NonZeroU32::new(120).unwrap());
        let start = Instant::now();
        for _ in 0..3 {
            limiter.rate_limiter.until_ready().await;
        }
        // 120/min == one permit every 0.5s; three permits (one immediate) should take
        // at least ~1s, comfortably bounded above by a generous margin for CI jitter.
        assert!(start.elapsed().as_millis() >= 900);
    }
}
