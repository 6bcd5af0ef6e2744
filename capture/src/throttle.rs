//! Sliding-window throttle for viewport captures.
//!
//! DESIGN
//! ======
//! Browsers cap how often an extension may screenshot a tab. Instead of
//! failing when the quota is exhausted, `acquire` waits until the oldest
//! capture in the window expires. Timestamps come from `tokio::time` so
//! paused-clock tests run instantly.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod tests;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

pub struct CaptureThrottle {
    max_per_window: usize,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl CaptureThrottle {
    #[must_use]
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self { max_per_window: max_per_window.max(1), window, stamps: Mutex::new(VecDeque::new()) }
    }

    /// Wait for a slot, then claim it.
    pub async fn acquire(&self) {
        loop {
            let Some(wait) = self.try_acquire_at(Instant::now()) else {
                return;
            };
            debug!(wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "capture throttled");
            tokio::time::sleep(wait).await;
        }
    }

    /// Claim a slot at `now`, or return how long until one frees up.
    fn try_acquire_at(&self, now: Instant) -> Option<Duration> {
        let mut stamps = self.stamps.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        prune_window(&mut stamps, now, self.window);
        if stamps.len() < self.max_per_window {
            stamps.push_back(now);
            return None;
        }
        let oldest = *stamps.front()?;
        Some((oldest + self.window).saturating_duration_since(now).max(Duration::from_millis(1)))
    }
}

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}
