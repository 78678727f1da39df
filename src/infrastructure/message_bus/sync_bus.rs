//! Synchronous message bus implementation
//!
//! Uses std::sync::mpsc channels for communication between components, with
//! a type-erased registry so subscribers of different event types share one
//! bus instance.

use super::error_handling::{MessageBusError, MessageBusResult};
use super::events::{Event, EventType};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Consumer handle for receiving events of a specific type
pub struct Consumer<T: EventType> {
    receiver: Receiver<T>,
}

impl<T: EventType> Consumer<T> {
    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<T, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive an event, blocking until one is available
    pub fn recv(&mut self) -> Result<T, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event with a timeout
    pub fn recv_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<T, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<T> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Internal registry for managing event subscribers.
///
/// Senders are stored type-erased, keyed by the event type id.
struct SubscriberRegistry {
    subscribers: HashMap<String, Vec<Box<dyn std::any::Any + Send>>>,
}

impl SubscriberRegistry {
    fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    fn add_subscriber<T: EventType>(&mut self, sender: Sender<T>) {
        let type_id = T::type_id();
        self.subscribers
            .entry(type_id.to_string())
            .or_default()
            .push(Box::new(sender));
    }

    fn get_subscribers<T: EventType>(&self) -> Vec<&Sender<T>> {
        let type_id = T::type_id();
        self.subscribers
            .get(type_id)
            .map(|senders| {
                senders
                    .iter()
                    .filter_map(|boxed| boxed.downcast_ref::<Sender<T>>())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Main synchronous message bus for event notifications
pub struct MessageBus {
    registry: Arc<Mutex<SubscriberRegistry>>,
}

impl MessageBus {
    /// Create a new message bus instance
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(SubscriberRegistry::new())),
        }
    }

    /// Subscribe to events of a specific type.
    /// Returns a Consumer that can be used to receive events.
    pub fn subscribe<T: EventType>(&self) -> Consumer<T> {
        let (sender, receiver) = mpsc::channel();

        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.add_subscriber(sender);

        Consumer { receiver }
    }

    /// Publish an event to all subscribers of that event type
    pub fn publish<T: EventType>(&self, event: T) -> MessageBusResult<()> {
        let registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let subscribers = registry.get_subscribers::<T>();

        if subscribers.is_empty() {
            // No subscribers for this event type - this is not an error
            return Ok(());
        }

        let mut failed_sends = 0;
        let total_subscribers = subscribers.len();

        for subscriber in subscribers {
            if subscriber.send(event.clone()).is_err() {
                failed_sends += 1;
            }
        }

        if failed_sends > 0 {
            return Err(MessageBusError::SendFailed {
                reason: format!(
                    "{} of {} subscribers failed to receive event",
                    failed_sends, total_subscribers
                ),
            });
        }

        Ok(())
    }

    /// Convenience method to publish a unified Event
    pub fn publish_event(&self, event: Event) -> MessageBusResult<()> {
        match event {
            Event::StructureChanged(e) => self.publish(e),
            Event::ReindexSchemaRequested(e) => self.publish(e),
            Event::ReindexEntryRequested(e) => self.publish(e),
            Event::EntryIndexed(e) => self.publish(e),
            Event::CascadeCompleted(e) => self.publish(e),
            Event::ReindexTaskFailed(e) => self.publish(e),
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
