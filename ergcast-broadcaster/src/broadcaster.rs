use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ergcast_detect::Event;
use parking_lot::RwLock;

use crate::error::{DeliveryError, Result};
use crate::message::WireMessage;
use crate::subscriber::{Subscriber, SubscriptionId};

/// Outcome of one publish
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    /// Subscribers that accepted the message
    pub delivered: usize,
    /// Subscribers removed during this publish
    pub dropped: Vec<(SubscriptionId, DeliveryError)>,
}

/// Fans the ordered event stream out to every registered subscriber.
///
/// `publish` never blocks on a subscriber: each backend either accepts the
/// message immediately or is removed. Registration may happen concurrently
/// from any thread.
pub struct EventBroadcaster {
    subscribers: RwLock<BTreeMap<SubscriptionId, Box<dyn Subscriber>>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<S: Subscriber + 'static>(&self, subscriber: S) -> SubscriptionId {
        self.subscribe_boxed(Box::new(subscriber))
    }

    pub fn subscribe_boxed(&self, subscriber: Box<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let label = subscriber.describe();

        let mut subscribers = self.subscribers.write();
        subscribers.insert(id, subscriber);
        tracing::info!("Subscriber {} ({}) added. Total: {}", id, label, subscribers.len());
        id
    }

    /// Returns false if the id was unknown (already removed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            tracing::info!("Subscriber {} removed. Remaining: {}", id, subscribers.len());
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Serialize an event once and offer it to every subscriber.
    pub fn publish(&self, event: &Event) -> Result<PublishReport> {
        let message = WireMessage::from(event);
        self.publish_message(&message)
    }

    pub fn publish_message(&self, message: &WireMessage) -> Result<PublishReport> {
        let json: Arc<str> = Arc::from(message.to_json()?);
        Ok(self.publish_raw(&json))
    }

    /// Offer a pre-serialized message to every subscriber, dropping the ones
    /// that fail.
    pub fn publish_raw(&self, json: &Arc<str>) -> PublishReport {
        let mut report = PublishReport::default();

        {
            let subscribers = self.subscribers.read();
            for (id, subscriber) in subscribers.iter() {
                match subscriber.try_deliver(json) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            "Failed to deliver to subscriber {} ({}): {}",
                            id,
                            subscriber.describe(),
                            e
                        );
                        report.dropped.push((*id, e));
                    }
                }
            }
        }

        if !report.dropped.is_empty() {
            let mut subscribers = self.subscribers.write();
            for (id, _) in &report.dropped {
                subscribers.remove(id);
            }
            tracing::info!(
                "Removed {} dead subscriber(s). Remaining: {}",
                report.dropped.len(),
                subscribers.len()
            );
        }

        report
    }

    /// Drop every subscriber, closing channel-backed consumers.
    pub fn close_all(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let count = subscribers.len();
        subscribers.clear();
        if count > 0 {
            tracing::info!("Closed {} subscriber(s)", count);
        }
        count
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::{writer_subscriber, CallbackSubscriber, ChannelSubscriber};
    use std::sync::{mpsc as std_mpsc, Mutex};
    use std::time::{Duration, Instant};

    /// Writer standing in for a pipe nobody reads
    struct NeverReads(std_mpsc::Receiver<()>);

    impl std::io::Write for NeverReads {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn notice(text: &str) -> Event {
        Event::notice(text)
    }

    #[test]
    fn test_subscribe_and_count() {
        let broadcaster = EventBroadcaster::new();
        let (a, _rx_a) = ChannelSubscriber::new(4, "a");
        let (b, _rx_b) = ChannelSubscriber::new(4, "b");

        let id_a = broadcaster.subscribe(a);
        let id_b = broadcaster.subscribe(b);
        assert_ne!(id_a, id_b);
        assert_eq!(broadcaster.subscriber_count(), 2);

        assert!(broadcaster.unsubscribe(id_a));
        assert!(!broadcaster.unsubscribe(id_a));
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_in_order() {
        let broadcaster = EventBroadcaster::new();
        let (sub, mut rx) = ChannelSubscriber::new(8, "ordered");
        broadcaster.subscribe(sub);

        for i in 0..5 {
            let report = broadcaster.publish(&notice(&format!("m{}", i))).unwrap();
            assert_eq!(report.delivered, 1);
        }

        for i in 0..5 {
            let json = rx.try_recv().unwrap();
            assert_eq!(
                &*json,
                format!(r#"{{"type":"TXT","content":"m{}"}}"#, i).as_str()
            );
        }
    }

    #[test]
    fn test_lagging_subscriber_dropped_others_kept() {
        let broadcaster = EventBroadcaster::new();
        let (slow, _slow_rx) = ChannelSubscriber::new(1, "slow");
        let (fast, mut fast_rx) = ChannelSubscriber::new(16, "fast");
        let slow_id = broadcaster.subscribe(slow);
        broadcaster.subscribe(fast);

        broadcaster.publish(&notice("one")).unwrap();
        let report = broadcaster.publish(&notice("two")).unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, vec![(slow_id, DeliveryError::Lagging)]);
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.publish(&notice("three")).unwrap();
        let mut received = 0;
        while fast_rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[test]
    fn test_failing_callback_removed() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.subscribe(CallbackSubscriber::new("broken", |_: &str| {
            Err(DeliveryError::failed("boom"))
        }));

        let report = tokio_test::assert_ok!(broadcaster.publish(&notice("x")));
        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_receives_serialized_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let broadcaster = EventBroadcaster::new();
        broadcaster.subscribe(CallbackSubscriber::new("collect", move |m: &str| {
            sink.lock().unwrap().push(m.to_string());
            Ok(())
        }));

        broadcaster
            .publish(&Event::SessionWaiting {
                erg_id: "1".to_string(),
            })
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            [r#"{"type":"TXT","content":"Waiting for workout to begin..."}"#]
        );
    }

    #[test]
    fn test_close_all_closes_channels() {
        let broadcaster = EventBroadcaster::new();
        let (sub, mut rx) = ChannelSubscriber::new(4, "a");
        broadcaster.subscribe(sub);

        assert_eq!(broadcaster.close_all(), 1);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_publish_with_no_subscribers() {
        let broadcaster = EventBroadcaster::new();
        let report = tokio_test::assert_ok!(broadcaster.publish(&notice("nobody")));
        assert_eq!(report, PublishReport::default());
    }

    #[test]
    fn test_stalled_writer_does_not_hold_up_publish() {
        let broadcaster = EventBroadcaster::new();
        let (release, gate) = std_mpsc::channel();
        let (stalled, handle) = writer_subscriber(4, "stalled", NeverReads(gate)).unwrap();
        let stalled_id = broadcaster.subscribe(stalled);
        let (healthy, mut healthy_rx) = ChannelSubscriber::new(64, "healthy");
        broadcaster.subscribe(healthy);

        let started = Instant::now();
        let mut dropped = Vec::new();
        for i in 0..20 {
            let report = broadcaster.publish(&notice(&format!("m{}", i))).unwrap();
            dropped.extend(report.dropped);
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(dropped, vec![(stalled_id, DeliveryError::Lagging)]);
        assert_eq!(broadcaster.subscriber_count(), 1);

        let mut received = 0;
        while healthy_rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 20);

        drop(release);
        handle.join().unwrap();
    }
}
