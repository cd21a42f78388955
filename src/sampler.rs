// Sampler: polling lifecycle for one source adapter (cadence, timeout, last-known-good).
// Each attempt runs in its own task; the scheduler only asks "are you due?" and reads the slot.

use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::{Duration, Instant, timeout};
use tracing::Instrument;

use crate::adapter::{SourceAdapter, Telemetry};
use crate::clock::Clock;
use crate::error::{CollectError, ErrorKind, SchedulerError};
use crate::history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
use crate::models::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::rate::RateTracker;

/// Polling cadence, hard timeout and history depth for one sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub cadence: Duration,
    pub timeout: Duration,
    pub history_capacity: usize,
}

impl SamplerConfig {
    pub fn new(cadence_ms: u64, timeout_ms: u64) -> Self {
        Self {
            cadence: Duration::from_millis(cadence_ms),
            timeout: Duration::from_millis(timeout_ms),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Timeout must be shorter than cadence, else attempts for one domain could overlap.
    pub fn validate(&self, domain: Domain) -> Result<(), SchedulerError> {
        if self.cadence.is_zero() {
            return Err(SchedulerError::ZeroCadence(domain));
        }
        if self.timeout >= self.cadence {
            return Err(SchedulerError::TimeoutNotBelowCadence {
                domain,
                timeout_ms: self.timeout.as_millis() as u64,
                cadence_ms: self.cadence.as_millis() as u64,
            });
        }
        if self.history_capacity == 0 {
            return Err(SchedulerError::ZeroHistoryCapacity(domain));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SamplerState {
    Idle = 0,
    Collecting = 1,
    Stopped = 2,
}

impl SamplerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SamplerState::Idle,
            1 => SamplerState::Collecting,
            _ => SamplerState::Stopped,
        }
    }
}

/// What a tick did to one sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NotDue,
    /// Due, but the previous attempt is still running; skipped, not queued.
    Busy,
    Started,
    Stopped,
}

/// Running totals, for the periodic stats log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub unavailable: u64,
    pub timeouts: u64,
    pub skipped_busy: u64,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    unavailable: AtomicU64,
    timeouts: AtomicU64,
    skipped_busy: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SamplerStats {
        SamplerStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            skipped_busy: self.skipped_busy.load(Ordering::Relaxed),
        }
    }
}

/// State only the running attempt touches.
struct Bookkeeping<A: SourceAdapter> {
    adapter: A,
    rates: RateTracker,
    history: HistoryBuffer<<A::Output as Telemetry>::HistoryEntry>,
    announced_unavailable: bool,
}

type Slot<T> = watch::Sender<Option<Arc<DomainSnapshot<T>>>>;

/// Owns one adapter and the latest `DomainSnapshot` it produced.
///
/// The slot is only written by this sampler's attempts, which are strictly
/// sequential: the adapter lives behind an async mutex held for the whole attempt.
pub struct Sampler<A: SourceAdapter> {
    config: SamplerConfig,
    clock: Clock,
    state: AtomicU8,
    last_attempt: Mutex<Option<Instant>>,
    core: tokio::sync::Mutex<Bookkeeping<A>>,
    slot: Slot<A::Output>,
    counters: Counters,
}

impl<A: SourceAdapter> Sampler<A> {
    pub fn new(adapter: A, config: SamplerConfig, clock: Clock) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            config,
            clock,
            state: AtomicU8::new(SamplerState::Idle as u8),
            last_attempt: Mutex::new(None),
            core: tokio::sync::Mutex::new(Bookkeeping {
                adapter,
                rates: RateTracker::new(),
                history: HistoryBuffer::new(config.history_capacity),
                announced_unavailable: false,
            }),
            slot,
            counters: Counters::default(),
        }
    }

    pub fn domain(&self) -> Domain {
        <A::Output as Telemetry>::DOMAIN
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn state(&self) -> SamplerState {
        SamplerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> SamplerStats {
        self.counters.snapshot()
    }

    /// Latest cached snapshot (last-known-good, possibly flagged stale).
    pub fn latest(&self) -> Option<Arc<DomainSnapshot<A::Output>>> {
        self.slot.borrow().clone()
    }

    /// Receiver that observes every slot replacement.
    pub fn watch(&self) -> watch::Receiver<Option<Arc<DomainSnapshot<A::Output>>>> {
        self.slot.subscribe()
    }

    /// Due when no attempt has started yet, or `cadence` has elapsed since the last start.
    pub fn is_due(&self, now: Instant) -> bool {
        let last = self.last_attempt.lock().map(|g| *g).unwrap_or_else(|e| *e.into_inner());
        match last {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= self.config.cadence,
        }
    }

    /// Starts an attempt in a new task if due and idle.
    pub fn tick(self: &Arc<Self>, now: Instant) -> TickOutcome {
        if self.state() == SamplerState::Stopped {
            return TickOutcome::Stopped;
        }
        if !self.is_due(now) {
            return TickOutcome::NotDue;
        }
        if !self.begin_attempt(now) {
            Counters::bump(&self.counters.skipped_busy);
            tracing::debug!(
                domain = %self.domain(),
                "previous collection still running; tick skipped"
            );
            return TickOutcome::Busy;
        }
        let this = Arc::clone(self);
        let span = tracing::debug_span!("sampler", domain = %self.domain());
        tokio::spawn(async move { this.run_attempt().await }.instrument(span));
        TickOutcome::Started
    }

    /// Runs one attempt inline, ignoring cadence. Returns false if busy or stopped.
    pub async fn collect_now(&self) -> bool {
        if self.state() == SamplerState::Stopped || !self.begin_attempt(Instant::now()) {
            return false;
        }
        self.run_attempt().await;
        true
    }

    fn begin_attempt(&self, now: Instant) -> bool {
        let claimed = self
            .state
            .compare_exchange(
                SamplerState::Idle as u8,
                SamplerState::Collecting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if claimed {
            match self.last_attempt.lock() {
                Ok(mut g) => *g = Some(now),
                Err(e) => *e.into_inner() = Some(now),
            }
        }
        claimed
    }

    /// Stop ticking; an in-flight attempt still completes or times out.
    pub fn stop(&self) {
        self.state.store(SamplerState::Stopped as u8, Ordering::Release);
    }

    /// Leave `Stopped`. If an attempt from before `stop` is still running, the
    /// next tick waits for it on the adapter lock.
    pub fn resume(&self) {
        let _ = self.state.compare_exchange(
            SamplerState::Stopped as u8,
            SamplerState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    async fn run_attempt(&self) {
        Counters::bump(&self.counters.attempts);
        let budget = self.config.timeout;
        let mut core = self.core.lock().await;

        // On timeout the collect future is dropped, so a late result can never be merged.
        let outcome = timeout(
            budget,
            AssertUnwindSafe(core.adapter.collect(budget)).catch_unwind(),
        )
        .await;
        let finished = Instant::now();

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(CollectError::unknown(format!(
                "collector panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => {
                Counters::bump(&self.counters.timeouts);
                Err(CollectError::timed_out(budget))
            }
        };

        let core = &mut *core;
        let booked = std::panic::catch_unwind(AssertUnwindSafe(|| match result {
            Ok(reading) => self.record_success(core, reading, finished),
            Err(err) => self.record_failure(core, err, finished),
        }));
        if let Err(panic) = booked {
            let err = CollectError::transient(format!(
                "sampler bookkeeping panicked: {}",
                panic_message(panic.as_ref())
            ));
            tracing::error!(domain = %self.domain(), error = %err, "sampler bookkeeping failed");
            self.mark_stale(&err, finished);
        }

        let _ = self.state.compare_exchange(
            SamplerState::Collecting as u8,
            SamplerState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn record_success(&self, core: &mut Bookkeeping<A>, mut reading: A::Output, at: Instant) {
        Counters::bump(&self.counters.successes);
        core.announced_unavailable = false;
        reading.derive_rates(&mut core.rates, at.into_std());
        let timestamp = self.clock.epoch_ms(at);
        if let Some(entry) = reading.history_entry(timestamp) {
            core.history.push(entry);
        }
        let snapshot = DomainSnapshot::present(reading, core.history.snapshot(), timestamp);
        self.slot.send_replace(Some(Arc::new(snapshot)));
        tracing::trace!(domain = %self.domain(), timestamp, "collection succeeded");
    }

    fn record_failure(&self, core: &mut Bookkeeping<A>, err: CollectError, at: Instant) {
        let domain = self.domain();
        match err.kind {
            ErrorKind::Unavailable => {
                Counters::bump(&self.counters.unavailable);
                if !core.announced_unavailable {
                    tracing::info!(
                        domain = %domain,
                        reason = %err.message,
                        "domain not present on this host"
                    );
                    core.announced_unavailable = true;
                }
                let snapshot =
                    DomainSnapshot::not_present(core.history.snapshot(), self.clock.epoch_ms(at));
                self.slot.send_replace(Some(Arc::new(snapshot)));
                return;
            }
            ErrorKind::Transient => {
                Counters::bump(&self.counters.failures);
                tracing::warn!(
                    domain = %domain,
                    error = %err.message,
                    operation = "collect",
                    "collection failed; serving last-known-good"
                );
            }
            ErrorKind::Unknown => {
                Counters::bump(&self.counters.failures);
                tracing::error!(
                    domain = %domain,
                    error = ?err,
                    operation = "collect",
                    "unexpected collection failure; serving last-known-good"
                );
            }
        }
        self.mark_stale(&err, at);
    }

    /// Replace the slot with a flagged copy of the previous value. Never-collected stays `None`.
    fn mark_stale(&self, err: &CollectError, at: Instant) {
        let previous = self.slot.borrow().clone();
        if let Some(prev) = previous {
            let stale = prev.with_failure(err, self.clock.epoch_ms(at));
            self.slot.send_replace(Some(Arc::new(stale)));
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Type-erased sampler as seen by the scheduler.
pub trait DomainSampler: Send + Sync {
    fn domain(&self) -> Domain;
    fn config(&self) -> &SamplerConfig;
    fn state(&self) -> SamplerState;
    fn stats(&self) -> SamplerStats;
    fn on_tick(self: Arc<Self>, now: Instant) -> TickOutcome;
    /// Copy the cached snapshot (if any) into its composite field.
    fn place_latest(&self, composite: &mut CompositeSnapshot);
    fn stop(&self);
    fn resume(&self);
}

impl<A: SourceAdapter> DomainSampler for Sampler<A> {
    fn domain(&self) -> Domain {
        Sampler::domain(self)
    }

    fn config(&self) -> &SamplerConfig {
        Sampler::config(self)
    }

    fn state(&self) -> SamplerState {
        Sampler::state(self)
    }

    fn stats(&self) -> SamplerStats {
        Sampler::stats(self)
    }

    fn on_tick(self: Arc<Self>, now: Instant) -> TickOutcome {
        Sampler::tick(&self, now)
    }

    fn place_latest(&self, composite: &mut CompositeSnapshot) {
        if let Some(snapshot) = self.latest() {
            <A::Output as Telemetry>::place(snapshot, composite);
        }
    }

    fn stop(&self) {
        Sampler::stop(self)
    }

    fn resume(&self) {
        Sampler::resume(self)
    }
}
