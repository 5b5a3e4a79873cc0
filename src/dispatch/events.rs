//! Notifications raised by the dispatch engine.

use tokio::sync::broadcast;

use crate::comm::LocationInfo;

/// A state change other subsystems may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An identity granted us location sharing.
    SharingGranted {
        /// Local id of the granting identity.
        identity_id: i64,
    },
    /// An identity revoked location sharing.
    SharingRevoked {
        /// Local id of the revoking identity.
        identity_id: i64,
    },
    /// An identity asked us to share our location.
    SharingRequested {
        /// Local id of the requesting identity.
        identity_id: i64,
    },
    /// A friend's current location changed.
    FriendLocationUpdated {
        /// Local id of the friend record.
        friend_id: i64,
        /// The location as received.
        location: LocationInfo,
    },
}

/// Receiving end of an [`EventBus`].
pub type EventReceiver = broadcast::Receiver<Event>;

/// In-process fan-out of [`Event`]s.
///
/// Publishing never blocks and never fails; events published with no
/// subscriber are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to all events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    /// Publishes an event to current subscribers.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(Event::SharingRevoked { identity_id: 1 });
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.publish(Event::SharingGranted { identity_id: 1 });
        bus.publish(Event::SharingRevoked { identity_id: 1 });

        assert_eq!(rx.try_recv().unwrap(), Event::SharingGranted { identity_id: 1 });
        assert_eq!(rx.try_recv().unwrap(), Event::SharingRevoked { identity_id: 1 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.clone().publish(Event::SharingRequested { identity_id: 9 });
        assert_eq!(rx.try_recv().unwrap(), Event::SharingRequested { identity_id: 9 });
    }

    #[test]
    fn debug_reports_subscribers() {
        let bus = EventBus::new(4);
        let _rx = bus.subscribe();
        assert!(format!("{bus:?}").contains("subscribers: 1"));
    }
}
