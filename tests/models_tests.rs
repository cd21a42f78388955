// Model serialization, composite status, and the rate/history/format building blocks

mod common;

use common::*;
use pulsemon::error::CollectError;
use pulsemon::format::{Scaled, scale, scale_rate};
use pulsemon::history::HistoryBuffer;
use pulsemon::models::*;
use pulsemon::rate::RateTracker;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_rate_from_two_observations() {
    let mut tracker = RateTracker::new();
    let t0 = Instant::now();
    assert_eq!(tracker.observe("x", 1000, t0).rate_per_second, 0.0);
    let r = tracker.observe("x", 1500, t0 + Duration::from_secs(2));
    assert!((r.rate_per_second - 250.0).abs() < 1e-9);
}

#[test]
fn test_rate_counter_reset_is_zero_then_recovers() {
    let mut tracker = RateTracker::new();
    let t0 = Instant::now();
    tracker.observe("disk:sda:read", 5000, t0);
    let reset = tracker.observe("disk:sda:read", 100, t0 + Duration::from_secs(1));
    assert_eq!(reset.rate_per_second, 0.0);
    let next = tracker.observe("disk:sda:read", 600, t0 + Duration::from_secs(2));
    assert!((next.rate_per_second - 500.0).abs() < 1e-9);
}

#[test]
fn test_rate_streams_are_independent() {
    let mut tracker = RateTracker::new();
    let t0 = Instant::now();
    tracker.observe("net:eth0:rx", 0, t0);
    tracker.observe("net:wlan0:rx", 0, t0);
    let t1 = t0 + Duration::from_secs(1);
    assert_eq!(tracker.observe("net:eth0:rx", 100, t1).rate_per_second, 100.0);
    assert_eq!(tracker.observe("net:wlan0:rx", 7, t1).rate_per_second, 7.0);
}

#[test]
fn test_history_evicts_oldest_first() {
    let mut history = HistoryBuffer::new(3);
    for i in 1..=4 {
        history.push(i);
    }
    assert_eq!(&*history.snapshot(), &[2, 3, 4]);
    assert_eq!(history.latest(), Some(&4));
    assert_eq!(history.len(), 3);
}

#[test]
fn test_history_keeps_last_k_of_k_plus_five() {
    let capacity = 60;
    let mut history = HistoryBuffer::new(capacity);
    for i in 0..capacity + 5 {
        history.push(i);
    }
    let kept = history.snapshot();
    assert_eq!(kept.len(), capacity);
    assert_eq!(kept.first(), Some(&5));
    assert_eq!(kept.last(), Some(&(capacity + 4)));
    assert!(kept.windows(2).all(|w| w[0] + 1 == w[1]));
}

#[test]
fn test_rate_never_negative_over_mixed_sequence() {
    let mut tracker = RateTracker::new();
    let t0 = Instant::now();
    let ms = Duration::from_millis;
    let steps = [
        (100, ms(0)),
        (400, ms(1000)),
        (50, ms(2000)),
        (60, ms(2000)),
        (60, ms(3000)),
        (10_000, ms(3500)),
        (0, ms(4500)),
        (5, ms(4500)),
        (7, ms(4000)),
        (u64::MAX, ms(5500)),
        (1, ms(6500)),
    ];
    for (value, offset) in steps {
        let r = tracker.observe("disk:nvme0n1:write", value, t0 + offset);
        assert!(r.rate_per_second >= 0.0, "rate {} at {:?}", r.rate_per_second, offset);
        assert!(r.rate_per_second.is_finite());
    }
}

#[test]
fn test_format_examples() {
    assert_eq!(scale(0), Scaled::new(0.0, "B"));
    assert_eq!(scale(1536), Scaled::new(1.5, "KB"));
    assert_eq!(scale(1023), Scaled::new(1023.0, "B"));
    assert_eq!(scale(5 << 30), Scaled::new(5.0, "GB"));
    assert_eq!(scale_rate(1_048_576.0), Scaled::new(1.0, "MB/s"));
    assert_eq!(scale_rate(0.0).to_string(), "0 B/s");
}

#[test]
fn test_domain_snapshot_serializes_camel_case() {
    let snap = DomainSnapshot::present(network(10, 20), Arc::from(vec![]), 1_700_000_000_000);
    let v = serde_json::to_value(&snap).unwrap();
    assert_eq!(v["domain"], "network");
    assert_eq!(v["available"], true);
    assert_eq!(v["timestamp"], 1_700_000_000_000u64);
    assert!(v["error"].is_null());
    let iface = &v["data"]["interfaces"][0];
    assert_eq!(iface["bytesRecv"], 10);
    assert_eq!(iface["macAddress"], "");
    assert!(iface.get("rxRate").is_some());
    assert!(v["data"]["totals"].get("txRate").is_some());
}

#[test]
fn test_stale_snapshot_serializes_error() {
    let snap = DomainSnapshot::present(cpu(12.5), Arc::from(vec![]), 1000);
    let stale = snap.with_failure(&CollectError::transient("read failed"), 2000);
    let v = serde_json::to_value(&stale).unwrap();
    assert_eq!(v["data"]["usage"], 12.5);
    assert_eq!(v["data"]["usageIdle"], 87.5);
    assert_eq!(v["error"]["kind"], "transient");
    assert_eq!(v["error"]["since"], 2000);
    assert_eq!(v["error"]["consecutiveFailures"], 1);
}

#[test]
fn test_composite_status_and_json_shape() {
    let mut composite = CompositeSnapshot::empty(5000);
    composite.cpu = Some(Arc::new(DomainSnapshot::present(cpu(1.0), Arc::from(vec![]), 4000)));
    composite.npu = Some(Arc::new(DomainSnapshot::<NpuStats>::not_present(
        Arc::from(vec![]),
        4000,
    )));

    assert!(composite.is_populated(Domain::Cpu));
    assert!(!composite.is_populated(Domain::Gpu));
    let npu = composite.status(Domain::Npu);
    assert!(npu.populated && !npu.available);
    assert_eq!(composite.status(Domain::Cpu).timestamp, Some(4000));
    assert!(composite.stale_domains().is_empty());

    let v = serde_json::to_value(&composite).unwrap();
    assert_eq!(v["timestamp"], 5000);
    assert!(v["gpu"].is_null());
    assert_eq!(v["npu"]["available"], false);
    assert!(v["npu"]["data"].is_null());
    assert!(v.get("motherboard").is_some());
}

#[test]
fn test_motherboard_chassis_type_field_name() {
    let mut stats = MotherboardStats::default();
    stats.chassis.type_ = "Desktop".into();
    let v = serde_json::to_value(&stats).unwrap();
    assert_eq!(v["chassis"]["type"], "Desktop");
    assert!(v.get("refreshedAt").is_some());
}

#[test]
fn test_domain_names() {
    let names: Vec<&str> = Domain::ALL.iter().map(|d| d.as_str()).collect();
    assert_eq!(
        names,
        vec!["cpu", "memory", "gpu", "storage", "network", "npu", "motherboard"]
    );
    assert_eq!(serde_json::to_value(Domain::Npu).unwrap(), "npu");
}
