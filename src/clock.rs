// Snapshot timestamps: wall-clock epoch ms anchored once, advanced by the monotonic clock

use tokio::time::Instant;

/// Converts monotonic instants into epoch milliseconds that never go backwards.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor: Instant,
    anchor_epoch_ms: u64,
}

impl Clock {
    pub fn new() -> Self {
        let anchor_epoch_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
                0
            });
        Self {
            anchor: Instant::now(),
            anchor_epoch_ms,
        }
    }

    pub fn epoch_ms(&self, at: Instant) -> u64 {
        let elapsed = at.saturating_duration_since(self.anchor);
        self.anchor_epoch_ms + elapsed.as_millis() as u64
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch_ms(Instant::now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_with_monotonic_time() {
        let clock = Clock::new();
        let t0 = clock.now_ms();
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(clock.now_ms() - t0, 1500);
    }

    #[test]
    fn instants_before_anchor_clamp_to_anchor() {
        let clock = Clock::new();
        let before = clock.anchor - Duration::from_secs(5);
        assert_eq!(clock.epoch_ms(before), clock.anchor_epoch_ms);
    }
}
