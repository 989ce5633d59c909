//! Polling until a condition holds, instead of sleeping for a fixed time

use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::error::{ScenarioError, ScenarioResult};

/// How long to keep polling and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
    /// Show a spinner while waiting
    pub progress: bool,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            progress: false,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_progress(self, progress: bool) -> Self {
        Self { progress, ..self }
    }

    /// Same timeout, no waiting between attempts
    pub fn immediate(self) -> Self {
        Self {
            interval: Duration::ZERO,
            ..self
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(600), Duration::from_secs(10))
    }
}

/// Result of one polling attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    Ready(T),
    /// Not there yet; carries what was observed
    Pending(String),
}

/// Run `attempt` until it is ready or `policy.timeout` elapses.
///
/// Errors returned by the attempt itself abort polling immediately.
pub async fn poll_until<T, F, Fut>(
    condition: &str,
    policy: PollPolicy,
    mut attempt: F,
) -> ScenarioResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScenarioResult<Attempt<T>>>,
{
    let start = Instant::now();
    let spinner = policy.progress.then(|| spinner(condition));
    let mut attempts = 0u32;

    let result = loop {
        attempts = attempts.saturating_add(1);
        match attempt().await {
            Ok(Attempt::Ready(value)) => break Ok(value),
            Ok(Attempt::Pending(last)) => {
                tracing::debug!("Waiting for {} (attempt {}): {}", condition, attempts, last);
                if start.elapsed() >= policy.timeout {
                    break Err(ScenarioError::PollTimeout {
                        condition: condition.to_string(),
                        attempts,
                        elapsed: start.elapsed(),
                        last,
                    });
                }
                if let Some(pb) = &spinner {
                    pb.set_message(format!("{condition} (attempt {attempts})"));
                }
                if !policy.interval.is_zero() {
                    sleep(policy.interval).await;
                }
            }
            Err(err) => break Err(err),
        }
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result
}

fn spinner(condition: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} waiting for {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(condition.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> PollPolicy {
        PollPolicy::new(Duration::from_secs(5), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_ready_after_several_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = poll_until("pool online", fast(), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, ScenarioError>(if n < 3 {
                Attempt::Pending(format!("Pausing ({n})"))
            } else {
                Attempt::Ready(n)
            })
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_reports_condition_and_last_observation() {
        let policy = PollPolicy::new(Duration::from_millis(20), Duration::from_millis(5));
        let err = poll_until("session idle", policy, || async {
            Ok::<_, ScenarioError>(Attempt::<()>::Pending("starting".to_string()))
        })
        .await
        .unwrap_err();

        match err {
            ScenarioError::PollTimeout {
                condition,
                attempts,
                last,
                ..
            } => {
                assert_eq!(condition, "session idle");
                assert!(attempts >= 2);
                assert_eq!(last, "starting");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_attempt_errors_abort() {
        let err = poll_until("anything", fast(), || async {
            Err::<Attempt<()>, _>(ScenarioError::Assertion("boom".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Assertion(_)));
    }

    #[tokio::test]
    async fn test_immediate_policy_does_not_sleep() {
        let policy = PollPolicy::new(Duration::from_secs(60), Duration::from_secs(30)).immediate();
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = Instant::now();
        poll_until("replayed", policy, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ScenarioError>(if n < 4 { Attempt::Pending(String::new()) } else { Attempt::Ready(()) })
        })
        .await
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
