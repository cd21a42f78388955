// Source adapter seam: one collector per domain, plus per-domain derived fields

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CollectError;
use crate::models::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::rate::RateTracker;

/// A domain reading as returned by its adapter.
///
/// Implementations say how counters turn into rates, what goes into the
/// rolling history, and which composite field the domain occupies.
pub trait Telemetry: Clone + Debug + Send + Sync + Serialize + 'static {
    type HistoryEntry: Clone + Debug + Send + Sync + Serialize + 'static;

    const DOMAIN: Domain;

    /// Fill rate fields from cumulative counters. Called once per successful collection.
    fn derive_rates(&mut self, _rates: &mut RateTracker, _at: Instant) {}

    /// Entry to append to the domain history, if this reading has one.
    fn history_entry(&self, timestamp: u64) -> Option<Self::HistoryEntry>;

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot);
}

/// Collects one domain's readings.
///
/// `collect` must not block the async runtime; blocking OS calls belong in
/// `spawn_blocking`. The sampler enforces `budget` as a hard timeout and drops
/// the future when it expires. Expensive one-time identification should be
/// cached on the adapter itself.
#[async_trait]
pub trait SourceAdapter: Send + 'static {
    type Output: Telemetry;

    fn name(&self) -> &str {
        <Self::Output as Telemetry>::DOMAIN.as_str()
    }

    async fn collect(&mut self, budget: Duration) -> Result<Self::Output, CollectError>;
}
