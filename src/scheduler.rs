// Scheduler/aggregator: one timer drives every sampler's due-check, then merges the
// cached domain snapshots into a composite and publishes it. Never waits on collections.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

use crate::adapter::SourceAdapter;
use crate::clock::Clock;
use crate::error::SchedulerError;
use crate::models::{CompositeSnapshot, Domain};
use crate::publisher::{Publisher, SubscriptionId};
use crate::sampler::{
    DomainSampler, Sampler, SamplerConfig, SamplerState, SamplerStats, TickOutcome,
};

/// Default scheduler tick: the fastest cadence.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Collects samplers (at most one per domain) before building a `Scheduler`.
pub struct SchedulerBuilder {
    tick: Duration,
    clock: Clock,
    publisher: Publisher,
    samplers: Vec<Arc<dyn DomainSampler>>,
    domains: HashSet<Domain>,
}

impl SchedulerBuilder {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            clock: Clock::new(),
            publisher: Publisher::new(),
            samplers: Vec::new(),
            domains: HashSet::new(),
        }
    }

    /// Publish through an existing publisher instead of a fresh one.
    pub fn publisher(mut self, publisher: Publisher) -> Self {
        self.publisher = publisher;
        self
    }

    /// Register `adapter` with its polling config. Rejects a second sampler for the same domain.
    pub fn add<A: SourceAdapter>(
        &mut self,
        adapter: A,
        config: SamplerConfig,
    ) -> Result<Arc<Sampler<A>>, SchedulerError> {
        let sampler = Arc::new(Sampler::new(adapter, config, self.clock));
        let domain = sampler.domain();
        config.validate(domain)?;
        if !self.domains.insert(domain) {
            return Err(SchedulerError::DuplicateDomain(domain));
        }
        self.samplers.push(sampler.clone());
        Ok(sampler)
    }

    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        if self.tick.is_zero() {
            return Err(SchedulerError::ZeroTick);
        }
        let mut samplers = self.samplers;
        samplers.sort_by_key(|s| s.domain());
        Ok(Scheduler {
            inner: Arc::new(Inner {
                tick: self.tick,
                clock: self.clock,
                samplers,
                publisher: self.publisher,
                running: Mutex::new(None),
                ticks_total: AtomicU64::new(0),
            }),
        })
    }
}

struct Running {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Inner {
    tick: Duration,
    clock: Clock,
    samplers: Vec<Arc<dyn DomainSampler>>,
    publisher: Publisher,
    running: Mutex<Option<Running>>,
    ticks_total: AtomicU64,
}

/// Per-sampler status, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerReport {
    pub domain: Domain,
    pub state: SamplerState,
    pub stats: SamplerStats,
}

/// Drives all samplers and publishes one `CompositeSnapshot` per tick.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn builder(tick: Duration) -> SchedulerBuilder {
        SchedulerBuilder::new(tick)
    }

    /// Start the tick loop. Returns false (no-op) if already running.
    /// Must be called within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = match self.inner.running.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if running.is_some() {
            return false;
        }
        for sampler in &self.inner.samplers {
            sampler.resume();
        }
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let span = tracing::debug_span!(
            "scheduler",
            tick_ms = self.inner.tick.as_millis() as u64
        );
        let handle = tokio::spawn(run(self.inner.clone(), shutdown_rx).instrument(span));
        *running = Some(Running {
            shutdown_tx,
            handle,
        });
        tracing::info!(
            tick_ms = self.inner.tick.as_millis() as u64,
            samplers = self.inner.samplers.len(),
            "scheduler started"
        );
        true
    }

    /// Stop the tick loop. Returns false (no-op) if not running.
    ///
    /// Waits only for the loop itself; in-flight collections finish or time out
    /// on their own and are not awaited.
    pub async fn stop(&self) -> bool {
        let running = match self.inner.running.lock() {
            Ok(mut g) => g.take(),
            Err(e) => e.into_inner().take(),
        };
        let Some(Running {
            shutdown_tx,
            handle,
        }) = running
        else {
            return false;
        };
        for sampler in &self.inner.samplers {
            sampler.stop();
        }
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "scheduler loop ended abnormally");
        }
        tracing::info!("scheduler stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        match self.inner.running.lock() {
            Ok(g) => g.is_some(),
            Err(e) => e.into_inner().is_some(),
        }
    }

    /// One tick at `now`: trigger due samplers, then assemble and publish from cached values.
    pub fn tick(&self, now: Instant) -> Arc<CompositeSnapshot> {
        self.inner.tick(now)
    }

    /// Composite of the samplers' current cached values, without triggering or publishing.
    pub fn assemble(&self) -> CompositeSnapshot {
        self.inner.assemble(Instant::now())
    }

    /// Most recently published composite; `None` before the first tick.
    pub fn get_latest(&self) -> Option<Arc<CompositeSnapshot>> {
        self.inner.publisher.latest()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(Arc<CompositeSnapshot>) -> anyhow::Result<()> + Send + 'static,
    {
        self.inner.publisher.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.publisher.unsubscribe(id)
    }

    pub fn publisher(&self) -> &Publisher {
        &self.inner.publisher
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.inner.samplers.iter().map(|s| s.domain()).collect()
    }

    pub fn reports(&self) -> Vec<SamplerReport> {
        self.inner
            .samplers
            .iter()
            .map(|s| SamplerReport {
                domain: s.domain(),
                state: s.state(),
                stats: s.stats(),
            })
            .collect()
    }

    pub fn ticks_total(&self) -> u64 {
        self.inner.ticks_total.load(Ordering::Relaxed)
    }
}

impl Inner {
    fn tick(&self, now: Instant) -> Arc<CompositeSnapshot> {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        for sampler in &self.samplers {
            let sampler = Arc::clone(sampler);
            let domain = sampler.domain();
            match std::panic::catch_unwind(AssertUnwindSafe(|| sampler.on_tick(now))) {
                Ok(TickOutcome::Started) => {
                    tracing::trace!(domain = %domain, "collection started");
                }
                Ok(_) => {}
                Err(_) => {
                    tracing::error!(
                        domain = %domain,
                        "sampler tick panicked; treated as transient"
                    );
                }
            }
        }
        let snapshot = Arc::new(self.assemble(now));
        self.publisher.publish(snapshot.clone());
        snapshot
    }

    fn assemble(&self, now: Instant) -> CompositeSnapshot {
        let mut composite = CompositeSnapshot::empty(self.clock.epoch_ms(now));
        for sampler in &self.samplers {
            sampler.place_latest(&mut composite);
        }
        composite
    }
}

async fn run(inner: Arc<Inner>, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut tick = interval(inner.tick);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                tracing::debug!("scheduler loop shutting down");
                break;
            }
            now = tick.tick() => {
                inner.tick(now);
            }
        }
    }
}
