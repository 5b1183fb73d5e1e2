use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-interval retry budget: at most `max_attempts` tries, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on the time spent sleeping between attempts.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Call `attempt` until it yields a value, fails, or the policy runs out.
///
/// `Ok(Some(_))` stops immediately, `Ok(None)` sleeps one interval and
/// retries, and `Err(_)` is returned at once without further attempts.
/// Returns `Ok(None)` when every attempt came back empty.
pub async fn poll_until<T, E, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<Option<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for n in 1..=policy.max_attempts {
        if let Some(value) = attempt(n).await? {
            return Ok(Some(value));
        }
        sleep(policy.interval).await;
    }
    Ok(None)
}
