//! # Event Bus System
//!
//! A publish/subscribe channel built on `tokio::sync::broadcast`, used to
//! signal connection state transitions (token set, token revoked) to any
//! interested listener without coupling the emitter to its audience.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     emit      ┌───────────┐
//! │ Connection ├──────────────>│           │
//! └────────────┘               │ EventBus  │     subscribe    ┌────────────┐
//!                              │ (broadcast├─────────────────>│ Subscriber │
//! ┌────────────┐     emit      │  channel) │                  └────────────┘
//! │ Callback   ├──────────────>│           │     subscribe    ┌────────────┐
//! │ server     │               │           ├─────────────────>│ Subscriber │
//! └────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::EventBus;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Ping { Set, Unset }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus: EventBus<Ping> = EventBus::new(100);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(Ping::Set).ok();
//! assert_eq!(sub.recv().await.unwrap(), Ping::Set);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` produces two receive errors:
//!
//! - `RecvError::Lagged(n)`: the subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving new events.
//! - `RecvError::Closed`: all senders have been dropped.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a
//! signal to exit.

use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Balances memory usage with the ability to absorb bursts of events.
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: Clone> EventBus<E> {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events buffered per subscriber. A
    ///   subscriber behind by more than this receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are no active subscribers.
    pub fn emit(&self, event: E) -> Result<usize, SendError<E>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that observes all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<E> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestEvent {
        Set { value: u32 },
        Unset,
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus: EventBus<TestEvent> = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus: EventBus<TestEvent> = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus: EventBus<TestEvent> = EventBus::new(10);

        // Should error when no subscribers
        assert!(bus.emit(TestEvent::Unset).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus: EventBus<TestEvent> = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = TestEvent::Set { value: 7 };
        let result = bus.emit(event.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus: EventBus<TestEvent> = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.emit(TestEvent::Set { value: 1 }).ok();

        assert_eq!(sub1.recv().await.unwrap(), TestEvent::Set { value: 1 });
        assert_eq!(sub2.recv().await.unwrap(), TestEvent::Set { value: 1 });
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus: EventBus<TestEvent> = EventBus::new(2); // Very small buffer
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(TestEvent::Set { value: i }).ok();
        }

        // First recv should indicate lagging
        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus: EventBus<TestEvent> = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(TestEvent::Set { value: i }).ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for _ in 0..10 {
                bus2.emit(TestEvent::Unset).ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }
}
