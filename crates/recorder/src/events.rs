use hls_model::LifecycleEvent;
use tokio::sync::broadcast;

/// Publish-only, multi-subscriber lifecycle event bus for one recording.
///
/// `tokio::sync::broadcast` already satisfies the ordering and backpressure
/// contract this needs: publishes are delivered in send order to every
/// receiver, and a subscriber that falls behind only misses the oldest
/// buffered events on its next `recv` (it never blocks the publisher).
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Best-effort publish: if there are no subscribers this is a no-op.
    pub fn publish(&self, event: LifecycleEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_model::{RecorderId, StopReason};

    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(LifecycleEvent::Ready {});
        bus.publish(LifecycleEvent::start("u", "f", 0, 0, RecorderId::HlsLive));
        bus.publish(LifecycleEvent::stop(StopReason::Complete, None, None, RecorderId::HlsLive));

        assert!(matches!(rx.recv().await.unwrap(), LifecycleEvent::Ready {}));
        assert!(matches!(rx.recv().await.unwrap(), LifecycleEvent::Start { .. }));
        assert!(matches!(rx.recv().await.unwrap(), LifecycleEvent::Stop { .. }));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(LifecycleEvent::Ready {});
    }
}
