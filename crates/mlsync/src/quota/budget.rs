use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::time::{Duration, Instant};

use super::limits::{LimitConfig, LimitDimension};
use super::pause::PauseState;
use super::snapshot::QuotaSnapshot;

pub(crate) const SECOND: Duration = Duration::from_secs(1);
pub(crate) const MINUTE: Duration = Duration::from_secs(60);
pub(crate) const HOUR: Duration = Duration::from_secs(60 * 60);
pub(crate) const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Added to the hourly request-count wait.
pub const HOURLY_REQUEST_BUFFER: Duration = MINUTE;
/// Added to the hourly byte wait.
pub const HOURLY_BYTES_BUFFER: Duration = Duration::from_secs(5 * 60);

/// One completed request as seen by the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowSample {
    pub occurred_at: Instant,
    pub byte_size: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    samples: VecDeque<RateWindowSample>,
    last_request: Option<Instant>,
    total_requests: u64,
    total_bytes: u64,
}

impl Ledger {
    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.samples.front() {
            if now.saturating_duration_since(front.occurred_at) >= DAY {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn window(&self, now: Instant, window: Duration) -> impl Iterator<Item = &RateWindowSample> {
        self.samples
            .iter()
            .filter(move |s| now.saturating_duration_since(s.occurred_at) < window)
    }

    pub(crate) fn count(&self, now: Instant, window: Duration) -> u64 {
        self.window(now, window).count() as u64
    }

    pub(crate) fn bytes(&self, now: Instant, window: Duration) -> u64 {
        self.window(now, window).map(|s| s.byte_size).sum()
    }

    pub(crate) fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub(crate) fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Time until the oldest sample in `window` leaves it, plus `buffer`.
    fn wait_for_oldest(
        &self,
        now: Instant,
        window: Duration,
        buffer: Duration,
        bytes_only: bool,
    ) -> Duration {
        let oldest = self
            .window(now, window)
            .find(|s| !bytes_only || s.byte_size > 0)
            .map(|s| s.occurred_at);

        match oldest {
            Some(at) => window.saturating_sub(now.saturating_duration_since(at)) + buffer,
            None => buffer,
        }
    }

    /// The first violated limit, checked from the widest window down, with
    /// the wait needed to clear it.
    fn required_wait(&self, now: Instant, limits: &LimitConfig) -> Option<(LimitDimension, Duration)> {
        if self.count(now, DAY) >= u64::from(limits.max_req_per_24h) {
            let wait = self.wait_for_oldest(now, DAY, Duration::ZERO, false);
            return Some((LimitDimension::DayRequests, wait));
        }

        if self.bytes(now, DAY) >= limits.max_bytes_per_24h() {
            let wait = self.wait_for_oldest(now, DAY, Duration::ZERO, true);
            return Some((LimitDimension::DayBytes, wait));
        }

        if self.count(now, HOUR) >= u64::from(limits.max_req_per_hour) {
            let wait = self.wait_for_oldest(now, HOUR, HOURLY_REQUEST_BUFFER, false);
            return Some((LimitDimension::HourRequests, wait));
        }

        if self.bytes(now, HOUR) >= limits.max_bytes_per_hour() {
            let wait = self.wait_for_oldest(now, HOUR, HOURLY_BYTES_BUFFER, true);
            return Some((LimitDimension::HourBytes, wait));
        }

        if self.count(now, SECOND) >= u64::from(limits.max_req_per_second) {
            let wait = self.wait_for_oldest(now, SECOND, Duration::ZERO, false);
            return Some((LimitDimension::SecondRequests, wait));
        }

        None
    }
}

/// Blocks outbound requests until every windowed limit has room.
///
/// Pure bookkeeping plus sleeping: the governor never touches the network.
/// Clones share the same sample history and pause state, so one governor
/// per provider is enough no matter how many clients use it.
#[derive(Debug, Clone)]
pub struct RateGovernor {
    limits: Arc<LimitConfig>,
    ledger: Arc<Mutex<Ledger>>,
    pause: PauseState,
}

impl RateGovernor {
    pub fn new(limits: LimitConfig) -> Self {
        if let Some(dimension) = limits.exceeds_provider_warning() {
            tracing::warn!(
                %dimension,
                "Configured limit exceeds the provider warning threshold"
            );
        }

        Self {
            limits: Arc::new(limits),
            ledger: Arc::new(Mutex::new(Ledger::default())),
            pause: PauseState::new(),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &LimitConfig {
        &self.limits
    }

    /// Shared throttle pause consulted before every request.
    #[must_use]
    pub fn pause(&self) -> &PauseState {
        &self.pause
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until a request may be sent.
    ///
    /// Honors an active throttle pause first, then sleeps through every
    /// violated window (re-validating from the top after each sleep), then
    /// enforces the minimum gap since the previous request.
    pub async fn await_budget(&self) {
        self.pause.wait_if_paused().await;

        loop {
            let violation = {
                let mut ledger = self.ledger();
                let now = Instant::now();
                ledger.prune(now);
                ledger.required_wait(now, &self.limits)
            };

            let Some((dimension, wait)) = violation else {
                break;
            };

            tracing::warn!(
                %dimension,
                wait_secs = wait.as_secs_f64(),
                "Rate budget exhausted, waiting for window to clear"
            );
            tokio::time::sleep(wait).await;
        }

        let delay = {
            let ledger = self.ledger();
            ledger.last_request.and_then(|last| {
                let ready_at = last + self.limits.min_delay();
                ready_at.checked_duration_since(Instant::now())
            })
        };

        if let Some(delay) = delay
            && !delay.is_zero()
        {
            tokio::time::sleep(delay).await;
        }
    }

    /// Record one completed request and the bytes it transferred.
    pub fn record_request(&self, byte_size: u64) {
        let now = Instant::now();
        let mut ledger = self.ledger();
        ledger.samples.push_back(RateWindowSample {
            occurred_at: now,
            byte_size,
        });
        ledger.last_request = Some(now);
        ledger.total_requests += 1;
        ledger.total_bytes = ledger.total_bytes.saturating_add(byte_size);
    }

    /// Current usage per dimension.
    #[must_use]
    pub fn snapshot(&self) -> QuotaSnapshot {
        let mut ledger = self.ledger();
        let now = Instant::now();
        ledger.prune(now);
        QuotaSnapshot::from_ledger(&ledger, now, &self.limits, self.pause.remaining())
    }

    /// Log the current usage at info level.
    pub fn log_snapshot(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            requests_last_second = snapshot.requests_last_second,
            requests_last_hour = snapshot.requests_last_hour,
            requests_last_24h = snapshot.requests_last_24h,
            mb_last_hour = snapshot.mb_last_hour,
            gb_last_24h = snapshot.gb_last_24h,
            total_gb = snapshot.total_gb,
            health = %snapshot.health,
            "Rate limit usage"
        );
    }

    /// Log every dimension above the warning threshold.
    ///
    /// Warnings are informational; nothing is refused because of them.
    pub fn warn_if_near_limits(&self) -> bool {
        let snapshot = self.snapshot();
        for message in &snapshot.warning_messages {
            tracing::warn!(health = %snapshot.health, "{}", message);
        }
        !snapshot.warning_messages.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn sample_count(&self) -> usize {
        self.ledger().samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::limits::BYTES_PER_MB;

    fn limits_without_delay() -> LimitConfig {
        LimitConfig {
            max_req_per_second: 100,
            min_delay_between_requests_ms: 0,
            ..LimitConfig::default()
        }
    }

    async fn issue(governor: &RateGovernor, bytes: u64) {
        governor.await_budget().await;
        governor.record_request(bytes);
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_request_waits_for_first_to_leave_hour_window() {
        let governor = RateGovernor::new(LimitConfig {
            max_req_per_hour: 5,
            ..limits_without_delay()
        });
        let start = Instant::now();

        for _ in 0..5 {
            issue(&governor, 0).await;
        }
        assert!(start.elapsed() < SECOND);

        governor.await_budget().await;
        assert!(start.elapsed() >= HOUR + HOURLY_REQUEST_BUFFER);
    }

    #[tokio::test(start_paused = true)]
    async fn per_second_limit_delays_third_request() {
        let governor = RateGovernor::new(LimitConfig {
            max_req_per_second: 2,
            ..limits_without_delay()
        });
        let start = Instant::now();

        issue(&governor, 0).await;
        issue(&governor, 0).await;
        assert!(start.elapsed() < SECOND);

        governor.await_budget().await;
        assert!(start.elapsed() >= SECOND);
        assert!(start.elapsed() < HOUR);
    }

    #[tokio::test(start_paused = true)]
    async fn hourly_bytes_wait_includes_five_minute_buffer() {
        let governor = RateGovernor::new(LimitConfig {
            max_mb_per_hour: 1,
            ..limits_without_delay()
        });
        let start = Instant::now();

        issue(&governor, BYTES_PER_MB).await;
        governor.await_budget().await;

        assert!(start.elapsed() >= HOUR + HOURLY_BYTES_BUFFER);
    }

    #[tokio::test(start_paused = true)]
    async fn daily_request_limit_waits_a_full_day() {
        let governor = RateGovernor::new(LimitConfig {
            max_req_per_24h: 3,
            ..limits_without_delay()
        });
        let start = Instant::now();

        for _ in 0..3 {
            issue(&governor, 0).await;
        }
        governor.await_budget().await;

        assert!(start.elapsed() >= DAY);
    }

    #[tokio::test(start_paused = true)]
    async fn daily_byte_limit_ignores_zero_byte_samples() {
        let governor = RateGovernor::new(LimitConfig {
            max_gb_per_24h: 1,
            max_mb_per_hour: 10_000,
            ..limits_without_delay()
        });
        let start = Instant::now();

        issue(&governor, 0).await;
        tokio::time::advance(HOUR * 2).await;
        let heavy_at = Instant::now();
        issue(&governor, 1024 * BYTES_PER_MB).await;

        governor.await_budget().await;
        // The wait is measured from the heavy sample, not the earlier empty one.
        assert!(Instant::now() >= heavy_at + DAY);
        assert!(start.elapsed() >= DAY + HOUR * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn minimum_delay_is_enforced_between_requests() {
        let governor = RateGovernor::new(LimitConfig {
            max_req_per_second: 100,
            min_delay_between_requests_ms: 500,
            ..LimitConfig::default()
        });
        let start = Instant::now();

        issue(&governor, 0).await;
        issue(&governor, 0).await;

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn samples_older_than_a_day_are_pruned() {
        let governor = RateGovernor::new(limits_without_delay());
        for _ in 0..3 {
            issue(&governor, 10).await;
        }
        assert_eq!(governor.snapshot().requests_last_24h, 3);

        tokio::time::advance(HOUR * 12).await;
        assert_eq!(governor.snapshot().requests_last_24h, 3);
        assert_eq!(governor.snapshot().requests_last_hour, 0);

        tokio::time::advance(HOUR * 12).await;
        let snapshot = governor.snapshot();
        assert_eq!(snapshot.requests_last_24h, 0);
        assert_eq!(governor.sample_count(), 0);
        assert_eq!(snapshot.total_requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_after_idle_period_does_not_wait() {
        let governor = RateGovernor::new(LimitConfig {
            max_req_per_hour: 5,
            ..limits_without_delay()
        });
        for _ in 0..5 {
            issue(&governor, 0).await;
        }

        tokio::time::advance(HOUR * 2).await;
        let start = Instant::now();
        for _ in 0..5 {
            issue(&governor, 0).await;
        }
        assert!(start.elapsed() < SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn active_pause_delays_budget() {
        let governor = RateGovernor::new(limits_without_delay());
        governor.pause().pause_for(Duration::from_secs(30));

        let start = Instant::now();
        governor.await_budget().await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_history() {
        let governor = RateGovernor::new(limits_without_delay());
        let other = governor.clone();
        issue(&governor, 0).await;
        issue(&other, 0).await;
        assert_eq!(governor.snapshot().requests_last_hour, 2);
    }
}
