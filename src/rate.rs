// Rate derivation from cumulative counters (bytes, ops), keyed per stream

use std::collections::HashMap;
use std::time::Instant;

/// One cumulative counter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterPair {
    pub cumulative_value: u64,
    pub timestamp: Instant,
}

/// Non-negative rate per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateResult {
    pub rate_per_second: f64,
}

impl RateResult {
    pub const ZERO: RateResult = RateResult {
        rate_per_second: 0.0,
    };
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    pair: CounterPair,
    pass: u64,
}

/// Tracks the previous counter per stream key ("net:eth0:rx", "disk:sda:read", ...).
///
/// Degenerate inputs (first sample, counter reset, non-advancing clock) yield 0.
/// The latest pair always becomes the new baseline so tracking recovers on the next call.
#[derive(Debug, Default)]
pub struct RateTracker {
    previous: HashMap<String, Baseline>,
    pass: u64,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        stream_key: &str,
        counter_value: u64,
        timestamp: Instant,
    ) -> RateResult {
        let current = Baseline {
            pair: CounterPair {
                cumulative_value: counter_value,
                timestamp,
            },
            pass: self.pass,
        };
        let prev = match self.previous.get_mut(stream_key) {
            Some(prev) => std::mem::replace(prev, current).pair,
            None => {
                self.previous.insert(stream_key.to_string(), current);
                return RateResult::ZERO;
            }
        };

        // checked_duration_since is None when the clock went backwards
        let dt = match timestamp.checked_duration_since(prev.timestamp) {
            Some(d) if !d.is_zero() => d.as_secs_f64(),
            _ => return RateResult::ZERO,
        };
        let delta = counter_value.saturating_sub(prev.cumulative_value);
        RateResult {
            rate_per_second: delta as f64 / dt,
        }
    }

    /// Ends an observation pass: streams not observed since the previous
    /// sweep (interfaces or disks that disappeared) are forgotten.
    pub fn sweep(&mut self) {
        let pass = self.pass;
        self.previous.retain(|_, b| b.pass == pass);
        self.pass = self.pass.wrapping_add(1);
    }

    pub fn stream_count(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_observation_is_zero() {
        let mut t = RateTracker::new();
        assert_eq!(t.observe("x", 100, Instant::now()), RateResult::ZERO);
        assert_eq!(t.stream_count(), 1);
    }

    #[test]
    fn same_timestamp_yields_zero_and_rebases() {
        let mut t = RateTracker::new();
        let t0 = Instant::now();
        t.observe("x", 100, t0);
        assert_eq!(t.observe("x", 500, t0).rate_per_second, 0.0);
        let r = t.observe("x", 700, t0 + Duration::from_secs(1));
        assert!((r.rate_per_second - 200.0).abs() < 1e-9);
    }

    #[test]
    fn clock_going_backwards_yields_zero() {
        let mut t = RateTracker::new();
        let t0 = Instant::now() + Duration::from_secs(10);
        t.observe("x", 100, t0);
        let r = t.observe("x", 200, t0 - Duration::from_secs(1));
        assert_eq!(r.rate_per_second, 0.0);
    }

    #[test]
    fn sweep_forgets_streams_missing_from_the_pass() {
        let mut t = RateTracker::new();
        let t0 = Instant::now();
        t.observe("net:eth0:rx", 1, t0);
        t.observe("net:wlan0:rx", 1, t0);
        t.sweep();
        assert_eq!(t.stream_count(), 2);

        t.observe("net:eth0:rx", 2, t0 + Duration::from_secs(1));
        t.sweep();
        assert_eq!(t.stream_count(), 1);
    }
}
