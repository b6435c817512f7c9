use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use gcslink_frame::TelemetryMessage;
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::error::SubscriberError;

type Callback = dyn Fn(&TelemetryMessage) -> Result<(), SubscriberError> + Send + Sync;

/// Handle to a subscriber callback.
///
/// Clones compare equal to each other; two handles built from separate
/// closures never do, even if the closures are identical. Keep a clone to
/// unsubscribe later.
#[derive(Clone)]
pub struct Subscriber {
    callback: Arc<Callback>,
    label: Option<Arc<str>>,
}

impl Subscriber {
    /// Wrap a fallible callback. Errors it returns are logged by the broker.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&TelemetryMessage) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            label: None,
        }
    }

    /// Wrap a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&TelemetryMessage) + Send + Sync + 'static,
    {
        Self::new(move |message| {
            callback(message);
            Ok(())
        })
    }

    /// Attach a name used in log output.
    pub fn named(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn id(&self) -> *const () {
        Arc::as_ptr(&self.callback) as *const ()
    }

    fn call(&self, message: &TelemetryMessage) -> Result<(), SubscriberError> {
        (self.callback)(message)
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("label", &self.label)
            .field("id", &self.id())
            .finish()
    }
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<String, Vec<Subscriber>>,
    wildcard: Vec<Subscriber>,
}

/// Fans decoded messages out to subscribers keyed by message type name.
///
/// Registration and publishing may happen from any thread. A publish works
/// on a snapshot of the registry taken when it starts, so callbacks may
/// subscribe or unsubscribe (themselves included) without deadlocking;
/// such changes apply from the next publish.
#[derive(Default)]
pub struct MessageBroker {
    registry: RwLock<Registry>,
}

impl MessageBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for messages named `msg_type`.
    ///
    /// Returns `false` if it was already registered for that type.
    pub fn subscribe(&self, msg_type: &str, subscriber: &Subscriber) -> bool {
        let mut registry = self.registry.write();
        let entry = registry.by_type.entry(msg_type.to_string()).or_default();
        if entry.contains(subscriber) {
            return false;
        }
        entry.push(subscriber.clone());
        true
    }

    /// Register `subscriber` for every message.
    pub fn subscribe_all(&self, subscriber: &Subscriber) -> bool {
        let mut registry = self.registry.write();
        if registry.wildcard.contains(subscriber) {
            return false;
        }
        registry.wildcard.push(subscriber.clone());
        true
    }

    /// Remove one type registration. Unknown pairs are ignored.
    pub fn unsubscribe(&self, msg_type: &str, subscriber: &Subscriber) -> bool {
        let mut registry = self.registry.write();
        let Some(entry) = registry.by_type.get_mut(msg_type) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|s| s != subscriber);
        let removed = entry.len() != before;
        if entry.is_empty() {
            registry.by_type.remove(msg_type);
        }
        removed
    }

    /// Remove `subscriber` everywhere: the wildcard set and every type.
    pub fn unsubscribe_all(&self, subscriber: &Subscriber) -> bool {
        let mut registry = self.registry.write();
        let before = registry.wildcard.len();
        registry.wildcard.retain(|s| s != subscriber);
        let mut removed = registry.wildcard.len() != before;

        registry.by_type.retain(|_, entry| {
            let len = entry.len();
            entry.retain(|s| s != subscriber);
            removed |= entry.len() != len;
            !entry.is_empty()
        });
        removed
    }

    /// Deliver `message` to its type subscribers, then to wildcard
    /// subscribers, each in registration order.
    ///
    /// A failing or panicking callback is logged and skipped. Returns the
    /// number of callbacks that completed successfully.
    pub fn publish(&self, message: &TelemetryMessage) -> usize {
        let targets: Vec<Subscriber> = {
            let registry = self.registry.read();
            registry
                .by_type
                .get(message.type_name())
                .into_iter()
                .flatten()
                .chain(registry.wildcard.iter())
                .cloned()
                .collect()
        };

        let mut delivered = 0;
        for subscriber in &targets {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.call(message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!(
                    msg_type = message.type_name(),
                    subscriber = subscriber.label().unwrap_or("anonymous"),
                    error = %err,
                    "subscriber failed"
                ),
                Err(payload) => warn!(
                    msg_type = message.type_name(),
                    subscriber = subscriber.label().unwrap_or("anonymous"),
                    panic = panic_message(payload.as_ref()),
                    "subscriber panicked"
                ),
            }
        }
        trace!(msg_type = message.type_name(), delivered, "published");
        delivered
    }

    /// Message types with at least one type-specific subscriber, sorted.
    pub fn subscribed_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.registry.read().by_type.keys().cloned().collect();
        types.sort();
        types
    }

    /// Total registrations, counting each type and the wildcard separately.
    pub fn subscriber_count(&self) -> usize {
        let registry = self.registry.read();
        registry.by_type.values().map(Vec::len).sum::<usize>() + registry.wildcard.len()
    }
}

impl fmt::Debug for MessageBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBroker")
            .field("subscribed_types", &self.subscribed_types())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
