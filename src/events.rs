//! Change notifications of a vector image wrapper.
//!
//! The wrapper owns one `ChangeBroadcaster`. Each scalar representation gets
//! a `ChangeForwarder`, a weak handle onto the same subscriber list, so its
//! own mutations show up as events of the parent. Consumers subscribe once on
//! the parent and receive everything through a plain `mpsc` receiver.
use crate::types::ScalarRepKey;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{channel, Receiver, Sender};

/// What changed.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeKind {
    ImageReplaced,
    SliceIndex([usize; 3]),
    TimePoint(usize),
    ViewportGeometry(usize),
    DisplayGeometry,
    DirectionMatrix,
    CoordinateTransform,
    SpatialTransform,
    NativeMapping,
    DisplayMapping,
    PixelsModified,
}

/// Who changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSource {
    Wrapper,
    Representation(ScalarRepKey),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WrapperChangeEvent {
    pub source: EventSource,
    pub kind: ChangeKind,
}

type Subscribers = RefCell<Vec<Sender<WrapperChangeEvent>>>;

fn deliver(subscribers: &Subscribers, event: WrapperChangeEvent) {
    subscribers
        .borrow_mut()
        .retain(|tx| tx.send(event.clone()).is_ok());
}

/// Outgoing notification channel owned by the wrapper.
#[derive(Debug, Default)]
pub struct ChangeBroadcaster {
    subscribers: Rc<Subscribers>,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new consumer. Dropping the receiver unsubscribes it on the
    /// next delivery.
    pub fn subscribe(&self) -> Receiver<WrapperChangeEvent> {
        let (tx, rx) = channel();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    pub fn emit(&self, kind: ChangeKind) {
        deliver(
            &self.subscribers,
            WrapperChangeEvent {
                source: EventSource::Wrapper,
                kind,
            },
        );
    }

    /// Handle a representation uses to rebroadcast its events as ours.
    pub fn forwarder(&self, key: ScalarRepKey) -> ChangeForwarder {
        ChangeForwarder {
            subscribers: Rc::downgrade(&self.subscribers),
            key,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// Non-owning link from a representation to its parent's channel.
#[derive(Clone, Debug)]
pub struct ChangeForwarder {
    subscribers: Weak<Subscribers>,
    key: ScalarRepKey,
}

impl ChangeForwarder {
    pub fn emit(&self, kind: ChangeKind) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            deliver(
                &subscribers,
                WrapperChangeEvent {
                    source: EventSource::Representation(self.key),
                    kind,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_events_arrive_on_parent_channel() {
        let broadcaster = ChangeBroadcaster::new();
        let rx = broadcaster.subscribe();
        let fwd = broadcaster.forwarder(ScalarRepKey::MAX);
        broadcaster.emit(ChangeKind::NativeMapping);
        fwd.emit(ChangeKind::NativeMapping);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].source, EventSource::Wrapper);
        assert_eq!(
            events[1].source,
            EventSource::Representation(ScalarRepKey::MAX)
        );
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let broadcaster = ChangeBroadcaster::new();
        let rx = broadcaster.subscribe();
        drop(rx);
        broadcaster.emit(ChangeKind::DisplayGeometry);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn forwarder_outliving_parent_is_silent() {
        let fwd = {
            let broadcaster = ChangeBroadcaster::new();
            broadcaster.forwarder(ScalarRepKey::component(0))
        };
        fwd.emit(ChangeKind::TimePoint(1));
    }
}
