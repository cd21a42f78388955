// Publisher fan-out: latest-wins delivery, isolation between subscribers, unsubscribe

use pulsemon::Publisher;
use pulsemon::models::CompositeSnapshot;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn snapshot(ts: u64) -> Arc<CompositeSnapshot> {
    Arc::new(CompositeSnapshot::empty(ts))
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn latest_is_none_until_first_publish() {
    let publisher = Publisher::new();
    assert!(publisher.latest().is_none());
    publisher.publish(snapshot(7));
    assert_eq!(publisher.latest().unwrap().timestamp, 7);
    assert_eq!(publisher.published_total(), 1);
}

#[tokio::test]
async fn failing_and_panicking_subscribers_do_not_affect_others() {
    let publisher = Publisher::new();
    publisher.subscribe(|_| -> anyhow::Result<()> { anyhow::bail!("sink unavailable") });
    publisher.subscribe(|_| -> anyhow::Result<()> { panic!("subscriber bug") });
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    publisher.subscribe(move |s| {
        tx.send(s.timestamp)?;
        Ok(())
    });
    assert_eq!(publisher.subscriber_count(), 3);

    publisher.publish(snapshot(1));
    assert_eq!(rx.recv().await, Some(1));
    publisher.publish(snapshot(2));
    assert_eq!(rx.recv().await, Some(2));
}

#[tokio::test]
async fn slow_subscriber_skips_to_latest() {
    let publisher = Publisher::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    publisher.subscribe(move |s| {
        sink.lock().unwrap().push(s.timestamp);
        Ok(())
    });

    // The subscriber task has not run yet; only the newest value is delivered.
    for ts in 1..=5 {
        publisher.publish(snapshot(ts));
    }
    settle().await;
    assert_eq!(*seen.lock().unwrap(), vec![5]);
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let publisher = Publisher::new();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let id = publisher.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    publisher.publish(snapshot(1));
    settle().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    assert!(publisher.unsubscribe(id));
    assert!(!publisher.unsubscribe(id));
    assert_eq!(publisher.subscriber_count(), 0);

    publisher.publish(snapshot(2));
    settle().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn watch_receiver_pulls_latest() {
    let publisher = Publisher::new();
    let mut rx = publisher.watch();
    publisher.publish(snapshot(3));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().as_ref().unwrap().timestamp, 3);
}
