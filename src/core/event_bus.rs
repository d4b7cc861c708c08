//! Pub/Sub event bus for outward player notifications.
//!
//! Architecture:
//! - Observers subscribe to notification types with callbacks (immediate invocation)
//! - emit() invokes callbacks immediately AND queues for deferred processing
//! - poll() returns queued notifications for batch processing in the embedder loop
//!
//! Callback order: registration order within the same notification type.
//! Cross-type order follows emit order, since emission is synchronous.
//!
//! Every callback runs behind its own panic guard: one failing observer is
//! logged and skipped, the remaining observers still receive the notification.

use log::warn;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Maximum notifications in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events. Events must be Send + Sync + 'static.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

// Blanket impl for all qualifying types
impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Type-erased callback
type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

/// Handle returned by `subscribe`, used to remove a single observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Subscribers = HashMap<TypeId, Vec<(SubscriptionId, Callback)>>;

/// Pub/Sub event bus with deferred processing support.
///
/// Two modes of operation:
/// 1. Immediate: subscribe() + emit() triggers callbacks instantly
/// 2. Deferred: emit() also queues notifications for poll()
///
/// Both modes work together - callbacks fire immediately, and notifications
/// are also available for batch processing via poll().
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<Subscribers>>,
    queue: Arc<Mutex<Vec<BoxedEvent>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_types", &self.subscribers.read().map(|s| s.len()).unwrap_or(0))
            .field("queue_len", &self.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // ========== Pub/Sub (immediate) ==========

    /// Subscribe to notifications of type E.
    ///
    /// Callback is invoked immediately when emit() is called.
    ///
    /// # Example
    /// ```ignore
    /// let id = player.events().subscribe::<PlaybackStateChanged, _>(|e| {
    ///     println!("{:?} -> {:?}", e.from, e.to);
    /// });
    /// player.events().unsubscribe(id);
    /// ```
    pub fn subscribe<E, F>(&self, callback: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, wrapped));
        id
    }

    /// Remove a single observer. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        for callbacks in subs.values_mut() {
            if let Some(pos) = callbacks.iter().position(|(sid, _)| *sid == id) {
                callbacks.remove(pos);
                return true;
            }
        }
        false
    }

    /// Emit notification: invoke callbacks immediately AND queue for deferred processing.
    pub fn emit<E: Event + Clone>(&self, event: E) {
        self.dispatch(TypeId::of::<E>(), &event, event.type_name());
        self.enqueue(Box::new(event));
    }

    /// Invoke callbacks for one notification, each behind its own panic guard.
    ///
    /// The subscriber list is snapshotted first so callbacks may subscribe or
    /// unsubscribe without deadlocking.
    fn dispatch(&self, type_id: TypeId, event: &dyn Any, type_name: &'static str) {
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&type_id)
            .cloned()
            .unwrap_or_default();

        for (id, cb) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| cb(event))).is_err() {
                warn!("Observer {:?} panicked while handling {}", id, type_name);
            }
        }
    }

    /// Queue for deferred processing with eviction
    fn enqueue(&self, event: BoxedEvent) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(event);
    }

    // ========== Deferred Processing ==========

    /// Poll all queued notifications for batch processing.
    ///
    /// Returns all notifications emitted since last poll:
    /// ```ignore
    /// for event in player.events().poll() {
    ///     if let Some(e) = downcast_event::<CurrentTimeChanged>(&event) { ... }
    /// }
    /// ```
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    // ========== Utilities ==========

    /// Clear subscribers for type E
    pub fn unsubscribe_all<E: Event>(&self) {
        self.subscribers.write().unwrap_or_else(|e| e.into_inner()).remove(&TypeId::of::<E>());
    }

    /// Check if there are subscribers for notification type E
    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Check queue length
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Helper: downcast BoxedEvent to concrete type
///
/// IMPORTANT: Must explicitly deref to `dyn Event` before calling `as_any()`.
/// Without explicit deref, the blanket impl `Event for Box<dyn Event>` intercepts
/// the call and returns `&dyn Any` containing `Box<dyn Event>` instead of the
/// original type, causing downcast to always fail.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
