//! Retry and backoff configuration with jitter support (component A, retry
//! half — see [`crate::metrics`] for the logging half).
//!
//! **Important**: retries are only safe for idempotent operations. Reads
//! are always safe to retry; the version-checked append in
//! [`crate::writer`] is safe because a retried attempt either lands once
//! (the original expected-version check still holds) or is correctly
//! observed as a [`crate::log_client::AppendOutcome::WrongExpectedVersion`]
//! conflict — never a silent duplicate.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry/backoff configuration.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
    /// Jitter mode for backoff delays (prevents thundering herd).
    pub jitter: JitterMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            multiplier: 1.3,
            max_retries: 10,
            jitter: JitterMode::Full,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterMode) -> Self {
        self.jitter = jitter;
        self
    }

    fn next_backoff(&self, attempt: u32, current_delay: Duration) -> Duration {
        let base_delay = if attempt == 0 {
            self.initial_backoff
        } else {
            let multiplied = current_delay.as_secs_f64() * self.multiplier;
            Duration::from_secs_f64(multiplied.min(self.max_backoff.as_secs_f64()))
        };
        apply_jitter(base_delay, &self.jitter)
    }

    fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Jitter mode for retry backoff (following AWS SDK patterns).
#[derive(Clone, Debug, Default)]
pub enum JitterMode {
    /// No jitter - use exact backoff delay
    None,
    /// Full jitter: random delay between 0 and calculated backoff
    #[default]
    Full,
    /// Equal jitter: half fixed + half random
    Equal,
    /// Decorrelated jitter (AWS recommended)
    Decorrelated,
}

/// Apply jitter to a backoff delay.
pub fn apply_jitter(delay: Duration, mode: &JitterMode) -> Duration {
    let mut rng = rand::thread_rng();

    match mode {
        JitterMode::None => delay,
        JitterMode::Full => Duration::from_secs_f64(rng.gen::<f64>() * delay.as_secs_f64()),
        JitterMode::Equal => {
            let half = delay.as_secs_f64() / 2.0;
            Duration::from_secs_f64(half + rng.gen::<f64>() * half)
        }
        JitterMode::Decorrelated => {
            let base = delay.as_secs_f64() / 3.0;
            let upper = delay.as_secs_f64() * 3.0;
            Duration::from_secs_f64(base + rng.gen::<f64>() * (upper - base))
        }
    }
}

/// Drive a physical call `f` under an optional [`RetryPolicy`].
///
/// `f` is invoked with the 1-based attempt number: attempt 1 is the base
/// call; attempts &ge; 2 log a retry note tagged with `context_label`
/// (spec.md §4.A: "attempts &ge; 2 [get] the log augmented by a
/// `{contextLabel: count}` property"). `policy = None` means exactly one
/// attempt, matching spec.md §6 ("absence means single attempt").
pub async fn with_retry<T, E, F, Fut>(
    policy: Option<&RetryPolicy>,
    context_label: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let Some(policy) = policy else {
        return f(1).await;
    };

    let mut attempt = 0u32;
    let mut delay = Duration::ZERO;
    loop {
        let result = f(attempt + 1).await;
        match result {
            Ok(v) => return Ok(v),
            Err(err) => {
                if !policy.should_retry(attempt) {
                    return Err(err);
                }
                delay = policy.next_backoff(attempt, delay);
                tracing::info!(
                    attempt = attempt + 1,
                    context_label,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after physical call failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
