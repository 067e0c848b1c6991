use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Substrings that mark a failure as upstream rate limiting.
const RATE_LIMIT_MARKERS: &[&str] = &["429", "too many requests", "quota"];

/// True when an error message looks like a rate-limit response.
pub fn is_rate_limited(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Delays between attempts. The number of retries is the number of delays,
/// so a call is attempted at most `delays.len() + 1` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn fixed(delay: Duration, retries: u32) -> Self {
        Self {
            delays: vec![delay; retries as usize],
        }
    }

    pub fn schedule(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// 2s, 5s, 10s.
    pub fn exponential() -> Self {
        Self::schedule(vec![
            Duration::from_secs(2),
            Duration::from_secs(5),
            Duration::from_secs(10),
        ])
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }
}

/// Run `op`, retrying only while its error message is a rate-limit signal.
/// Any other error is returned immediately; the last rate-limit error is
/// returned once the schedule is exhausted.
pub async fn retry_on_rate_limit<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let msg = e.to_string();
                let Some(delay) = policy.delays.get(attempt).copied() else {
                    return Err(e);
                };
                if !is_rate_limited(&msg) {
                    return Err(e);
                }
                attempt += 1;
                warn!(
                    call = label,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off: {msg}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
