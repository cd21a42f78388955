// Shared test helpers: scriptable fake sources and canned readings

#![allow(dead_code)]

use async_trait::async_trait;
use pulsemon::models::*;
use pulsemon::{CollectError, SourceAdapter, Telemetry};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Source whose result for call `n` (0-based) comes from `produce(n)`, optionally after a delay.
pub struct FakeSource<T, F> {
    produce: F,
    calls: Arc<AtomicUsize>,
    delay: Duration,
    first_delayed_call: usize,
    _output: PhantomData<fn() -> T>,
}

impl<T, F> FakeSource<T, F>
where
    T: Telemetry,
    F: FnMut(usize) -> Result<T, CollectError> + Send + 'static,
{
    pub fn new(produce: F) -> Self {
        Self {
            produce,
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            first_delayed_call: 0,
            _output: PhantomData,
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_from(0, delay)
    }

    /// Delay only call `first_delayed_call` and later ones.
    pub fn with_delay_from(mut self, first_delayed_call: usize, delay: Duration) -> Self {
        self.first_delayed_call = first_delayed_call;
        self.delay = delay;
        self
    }

    /// Shared call counter; stays readable after the source moves into a sampler.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl<T, F> SourceAdapter for FakeSource<T, F>
where
    T: Telemetry,
    F: FnMut(usize) -> Result<T, CollectError> + Send + 'static,
{
    type Output = T;

    async fn collect(&mut self, _budget: Duration) -> Result<T, CollectError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.first_delayed_call && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.produce)(n)
    }
}

/// Source that never returns.
pub struct HangingSource<T>(PhantomData<fn() -> T>);

impl<T> HangingSource<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<T: Telemetry> SourceAdapter for HangingSource<T> {
    type Output = T;

    async fn collect(&mut self, _budget: Duration) -> Result<T, CollectError> {
        std::future::pending().await
    }
}

pub fn cpu(usage: f64) -> CpuStats {
    CpuStats::with_usage(usage)
}

pub fn memory() -> MemoryStats {
    MemoryStats::from_totals(16 << 30, 8 << 30, 4 << 30, 0, 0)
}

/// One "eth0" interface with the given cumulative counters.
pub fn network(rx: u64, tx: u64) -> NetworkStats {
    NetworkStats {
        interfaces: vec![InterfaceStat {
            name: "eth0".into(),
            is_up: true,
            bytes_recv: rx,
            bytes_sent: tx,
            ..Default::default()
        }],
        totals: NetworkTotals::default(),
    }
}

pub fn gpu() -> GpuStats {
    GpuStats {
        controllers: vec![GpuController {
            index: 0,
            vendor: "NVIDIA".into(),
            model: "Test GPU".into(),
            driver_version: None,
            memory_total: Some(8 << 30),
            memory_used: Some(2 << 30),
            utilization: Some(50.0),
            temperature: Some(60.0),
            power_draw: None,
            power_limit: None,
        }],
    }
}

pub fn fixed_cpu(
    usage: f64,
) -> FakeSource<CpuStats, impl FnMut(usize) -> Result<CpuStats, CollectError> + Send + 'static> {
    FakeSource::new(move |_| Ok(cpu(usage)))
}

pub fn unavailable_npu()
-> FakeSource<NpuStats, impl FnMut(usize) -> Result<NpuStats, CollectError> + Send + 'static> {
    FakeSource::new(|_| Err(CollectError::unavailable("no NPU detected")))
}
