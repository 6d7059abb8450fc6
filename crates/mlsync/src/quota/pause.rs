use std::sync::{Arc, Mutex};

use tokio::time::{Duration, Instant};

/// Process-wide pause set when the provider throttles us.
///
/// Cloning shares the same state, so every client holding a clone of one
/// governor waits out the same throttle window.
#[derive(Debug, Clone, Default)]
pub struct PauseState {
    paused_until: Arc<Mutex<Option<Instant>>>,
}

impl PauseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause all callers for at least `duration` from now.
    ///
    /// An existing pause that ends later is kept.
    pub fn pause_for(&self, duration: Duration) -> Instant {
        let until = Instant::now() + duration;
        let mut guard = self.paused_until.lock().unwrap_or_else(|e| e.into_inner());
        let until = match *guard {
            Some(existing) if existing > until => existing,
            _ => until,
        };
        *guard = Some(until);
        until
    }

    /// Time left on the current pause, if one is active.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let guard = self.paused_until.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        guard
            .filter(|until| *until > now)
            .map(|until| until.duration_since(now))
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.remaining().is_some()
    }

    pub fn clear(&self) {
        *self.paused_until.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Sleep until no pause is active.
    ///
    /// Re-checks after waking because another caller may have extended the
    /// pause in the meantime.
    pub async fn wait_if_paused(&self) {
        while let Some(remaining) = self.remaining() {
            tracing::info!(
                remaining_secs = remaining.as_secs(),
                "Requests paused after provider throttle, waiting"
            );
            tokio::time::sleep(remaining).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn wait_if_paused_sleeps_for_the_remaining_pause() {
        let pause = PauseState::new();
        pause.pause_for(Duration::from_secs(90));
        assert!(pause.is_paused());

        let start = Instant::now();
        pause.wait_if_paused().await;
        assert!(start.elapsed() >= Duration::from_secs(90));
        assert!(!pause.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_pause_does_not_shorten_existing_one() {
        let pause = PauseState::new();
        pause.pause_for(Duration::from_secs(600));
        pause.pause_for(Duration::from_secs(5));

        let remaining = pause.remaining().expect("pause active");
        assert!(remaining > Duration::from_secs(500));
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_state() {
        let pause = PauseState::new();
        let other = pause.clone();
        pause.pause_for(Duration::from_secs(10));
        assert!(other.is_paused());

        other.clear();
        assert!(!pause.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_waiter_leaves_a_newer_pause_in_force() {
        let pause = PauseState::new();
        pause.pause_for(Duration::from_secs(10));

        let first = tokio::spawn({
            let pause = pause.clone();
            async move { pause.wait_if_paused().await }
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        first.await.expect("waiter");

        // Another caller throttled right as the first waiter finished.
        pause.pause_for(Duration::from_secs(60));
        let start = Instant::now();
        let second = tokio::spawn({
            let pause = pause.clone();
            async move { pause.wait_if_paused().await }
        });
        pause.wait_if_paused().await;
        second.await.expect("waiter");

        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(!pause.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_pause_reports_nothing_remaining() {
        let pause = PauseState::new();
        pause.pause_for(Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(pause.remaining(), None);
    }
}
