//! Bounded wait for the persistence queue to drain before shutdown

use std::time::Duration;

/// How a drain wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue reported empty within the time limit
    Drained,
    /// The time limit expired first; whatever was queued is abandoned
    TimedOut,
}

/// Poll `is_empty` every `poll_interval` on a helper task, giving up after `limit`
pub async fn wait_for_drain<F>(is_empty: F, limit: Duration, poll_interval: Duration) -> DrainOutcome
where
    F: Fn() -> bool + Send + 'static,
{
    let mut waiter = tokio::spawn(async move {
        while !is_empty() {
            tokio::time::sleep(poll_interval).await;
        }
    });

    match tokio::time::timeout(limit, &mut waiter).await {
        Ok(_) => DrainOutcome::Drained,
        Err(_) => {
            waiter.abort();
            DrainOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_empty_queue_drains_immediately() {
        let started = Instant::now();
        let outcome = wait_for_drain(|| true, Duration::from_secs(60), Duration::from_millis(100)).await;
        assert_eq!(outcome, DrainOutcome::Drained);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_wait_stops_once_queue_empties() {
        let empty = Arc::new(AtomicBool::new(false));
        let flag = empty.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let started = Instant::now();
        let probe = empty.clone();
        let outcome = wait_for_drain(
            move || probe.load(Ordering::SeqCst),
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(outcome, DrainOutcome::Drained);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_limit() {
        let started = Instant::now();
        let outcome = wait_for_drain(|| false, Duration::from_millis(50), Duration::from_millis(10)).await;

        assert_eq!(outcome, DrainOutcome::TimedOut);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }
}
