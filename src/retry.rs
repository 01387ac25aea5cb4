use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Exponential backoff policy for search engine requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Initial delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// 2.0 doubles the delay after every failure
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    /// Set the maximum delay between retries
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the attempt count, keeping delays
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Preset: search document writes (3 attempts)
    /// Delays: 200ms, 400ms
    pub fn search_write() -> Self {
        Self::new(3, Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_backoff_multiplier(2.0)
    }

    /// Preset: a single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before `attempt` (0-indexed); the first attempt never waits.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::search_write()
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects its error, or
/// the attempts run out. The last error is returned.
///
/// A config with zero attempts still runs the operation once.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: waiting {:?} before attempt {}/{}",
                operation_name,
                delay,
                attempt + 1,
                attempts
            );
            sleep(delay).await;
        }

        let error = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: recovered on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        attempts
                    );
                }
                return Ok(result);
            }
            Err(error) => error,
        };

        attempt += 1;
        if !should_retry(&error) {
            debug!("{}: not retryable: {}", operation_name, error);
            return Err(error);
        }
        if attempt >= attempts {
            warn!(
                "{}: giving up after {} attempt(s): {}",
                operation_name, attempts, error
            );
            return Err(error);
        }
        warn!(
            "{}: attempt {}/{} failed ({}), retrying",
            operation_name, attempt, attempts, error
        );
    }
}
