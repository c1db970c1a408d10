use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::shutdown::Shutdown;

const MIN_REFILL_PERIOD: Duration = Duration::from_millis(1);
/// Absorbs the nanosecond rounding of `refill_period`, which otherwise
/// leaves a tick's credit just under one token.
const CREDIT_EPSILON: f64 = 1e-6;

/// Token bucket shared by every worker of one run.
///
/// Tokens are added by a background task every `refill_period`; the bucket
/// never holds more than one period's worth, so the aggregate rate across
/// all workers stays at the configured requests per second.
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    /// Starts a limiter for `rate` requests per second. A rate of zero (or
    /// anything not positive and finite) means unlimited and yields `None`.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn spawn(rate: f64) -> Option<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let period = refill_period(rate);
        let per_tick = rate * period.as_secs_f64();
        let burst = burst_size(per_tick);

        let permits = Arc::new(Semaphore::new(1));
        let refill = spawn_refill(Arc::clone(&permits), period, per_tick, burst);
        Some(Self { permits, refill })
    }

    /// Waits for a token. Returns `false` when the run was cancelled first.
    pub async fn acquire(&self, shutdown: &Shutdown) -> bool {
        tokio::select! {
            () = shutdown.cancelled() => false,
            permit = self.permits.acquire() => permit.map(|permit| permit.forget()).is_ok(),
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

fn refill_period(rate: f64) -> Duration {
    let seconds = 1.0 / rate;
    Duration::try_from_secs_f64(seconds)
        .unwrap_or(MIN_REFILL_PERIOD)
        .max(MIN_REFILL_PERIOD)
}

fn burst_size(per_tick: f64) -> usize {
    whole_tokens(per_tick.ceil()).max(1)
}

fn whole_tokens(value: f64) -> usize {
    if value >= 1.0 { value as usize } else { 0 }
}

fn spawn_refill(
    permits: Arc<Semaphore>,
    period: Duration,
    per_tick: f64,
    burst: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut refill_tick = interval(period);
        refill_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial permit covers it.
        refill_tick.tick().await;
        let mut credit = 0.0_f64;
        loop {
            refill_tick.tick().await;
            credit += per_tick;
            let earned = (credit + CREDIT_EPSILON).floor();
            if earned < 1.0 {
                continue;
            }
            credit = (credit - earned).max(0.0);
            let available = permits.available_permits();
            if available < burst {
                permits.add_permits(whole_tokens(earned).min(burst.saturating_sub(available)));
            }
        }
    })
}
