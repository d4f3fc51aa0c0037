use std::fmt;
use std::time::{Duration, Instant};

const INITIAL_DELAY_MS: u64 = 5;
const MAX_RETRIES: u32 = 12;
const MAX_DELAY_MS: u64 = 250;

/// Error returned when a condition does not become true in time.
#[derive(Debug)]
pub struct WaitError {
    what: String,
    attempts: u32,
    waited: Duration,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timed out after {} attempts over {:?} waiting for {}",
            self.attempts, self.waited, self.what
        )
    }
}

impl std::error::Error for WaitError {}

/// Poll `predicate` until it returns true, yielding to the runtime between
/// attempts so spawned listeners can make progress.
///
/// Uses exponential backoff starting at 5ms with a maximum of 12 retries.
pub async fn wait_until<F>(what: &str, predicate: F, timeout: Duration) -> Result<(), WaitError>
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    let mut delay = Duration::from_millis(INITIAL_DELAY_MS);
    let mut attempts = 0;

    loop {
        attempts += 1;
        if predicate() {
            return Ok(());
        }

        if attempts >= MAX_RETRIES || start.elapsed() >= timeout {
            break;
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }

        tokio::time::sleep(delay.min(remaining)).await;
        delay = delay
            .checked_mul(2)
            .unwrap_or_else(|| Duration::from_millis(MAX_DELAY_MS))
            .min(Duration::from_millis(MAX_DELAY_MS));
    }

    Err(WaitError {
        what: what.to_string(),
        attempts,
        waited: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_until_returns_once_condition_holds() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            setter.store(true, Ordering::SeqCst);
        });

        wait_until("flag", || flag.load(Ordering::SeqCst), Duration::from_secs(2))
            .await
            .expect("flag should flip");
    }

    #[tokio::test]
    async fn wait_until_times_out_with_context() {
        let err = wait_until("never", || false, Duration::from_millis(1))
            .await
            .expect_err("should time out");
        assert!(
            err.to_string().contains("never"),
            "error message should name the condition"
        );
    }
}
