//! Signal/slot system for Horizon Shell.
//!
//! Every lifecycle notification in the desktop kernel (opening, closing,
//! activation, title changes, collection membership) is a [`Signal`]. Slots are
//! invoked synchronously on the emitting thread, in connection order.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The notification source
//! - [`ConnectionId`] - Identifier returned by [`Signal::connect`]
//! - [`Subscription`] - Owned registration that disconnects exactly once
//!
//! # Re-entrancy
//!
//! The connection table is snapshotted before slots run, so a slot may connect,
//! disconnect or emit on the same signal without deadlocking. A slot connected
//! during an emission is first invoked on the next emission.
//!
//! # Listener Failures
//!
//! A panicking slot is caught, logged at `error` level under
//! [`targets::SIGNAL`](crate::logging::targets::SIGNAL), and the remaining
//! slots still run. One faulty observer cannot block the lifecycle of the
//! object it observes.
//!
//! # Example
//!
//! ```
//! use horizon_shell_core::Signal;
//!
//! let title_changed = Signal::<String>::new();
//!
//! let conn_id = title_changed.connect(|title| {
//!     println!("Title is now: {}", title);
//! });
//!
//! title_changed.emit("Editor".to_string());
//! title_changed.disconnect(conn_id);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::{panic_message, targets};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Internal storage for a single connection.
struct Connection<Args> {
    slot: Slot<Args>,
    /// Connection order; slots are invoked in ascending sequence.
    sequence: u64,
}

struct SignalInner<Args> {
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    blocked: AtomicBool,
    next_sequence: AtomicU64,
}

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed (by reference) to connected slots. Use `()`
///   for signals with no arguments.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync`. Emission is always direct; crossing to the
/// UI-affine thread is the job of [`UiDispatcher`](crate::UiDispatcher), not of
/// the signal.
pub struct Signal<Args> {
    inner: Arc<SignalInner<Args>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                connections: Mutex::new(SlotMap::with_key()),
                blocked: AtomicBool::new(false),
                next_sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.inner.connections.lock().insert(Connection {
            slot: Arc::new(slot),
            sequence,
        })
    }

    /// Connect a slot and return an owned [`Subscription`].
    ///
    /// The connection is removed when the subscription is released or dropped,
    /// whichever happens first. The subscription does not keep the signal
    /// alive.
    ///
    /// ```
    /// use horizon_shell_core::Signal;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use std::sync::Arc;
    ///
    /// let signal = Signal::<i32>::new();
    /// let total = Arc::new(AtomicI32::new(0));
    /// {
    ///     let total = total.clone();
    ///     let _sub = signal.subscribe(move |&n| {
    ///         total.fetch_add(n, Ordering::SeqCst);
    ///     });
    ///     signal.emit(42);
    /// }
    /// signal.emit(43);
    /// assert_eq!(total.load(Ordering::SeqCst), 42);
    /// ```
    pub fn subscribe<F>(&self, slot: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        let weak: Weak<SignalInner<Args>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.connections.lock().remove(id);
            }
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.inner.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.inner.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.inner.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal by value.
    pub fn emit(&self, args: Args) {
        self.emit_ref(&args);
    }

    /// Emit the signal, invoking every connected slot with `args`.
    ///
    /// Slots observe a shared reference, so arguments carrying interior
    /// mutability (such as a cancel flag) can be used to collect answers
    /// from listeners.
    #[tracing::instrument(skip_all, target = "horizon_shell_core::signal", level = "trace")]
    pub fn emit_ref(&self, args: &Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots = self.snapshot();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| slot(args))) {
                tracing::error!(
                    target: targets::SIGNAL,
                    panic = %panic_message(payload.as_ref()),
                    "signal listener panicked; continuing with remaining listeners"
                );
            }
        }
    }

    /// Copy the connected slots in connection order, releasing the lock before
    /// any slot runs.
    fn snapshot(&self) -> Vec<Slot<Args>> {
        let connections = self.inner.connections.lock();
        let mut ordered: Vec<(u64, Slot<Args>)> = connections
            .values()
            .map(|conn| (conn.sequence, conn.slot.clone()))
            .collect();
        drop(connections);
        ordered.sort_by_key(|(sequence, _)| *sequence);
        ordered.into_iter().map(|(_, slot)| slot).collect()
    }
}

/// An observer registration that is released exactly once.
///
/// Returned by [`Signal::subscribe`]. Dropping the subscription releases it;
/// [`release`](Self::release) does so explicitly, and
/// [`detach`](Self::detach) gives up the handle while leaving the connection
/// in place for the lifetime of the signal.
#[must_use = "dropping a Subscription disconnects the slot immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Disconnect now.
    pub fn release(mut self) {
        self.release_inner();
    }

    /// Give up the handle without disconnecting.
    pub fn detach(mut self) {
        self.release = None;
    }

    /// Whether this subscription still holds its connection.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A set of subscriptions released together.
///
/// Used by owners that wire several lifecycle callbacks to one member and must
/// unhook all of them at once.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to the set.
    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Number of held subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the set holds no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription in the set.
    pub fn release_all(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);
static_assertions::assert_impl_all!(Subscription: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        signal.set_blocked(true);
        signal.emit(2);
        signal.set_blocked(false);
        signal.emit(3);

        assert_eq!(*received.lock(), vec![1, 3]);
    }

    #[test]
    fn test_slots_run_in_connection_order_after_reuse() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = order.clone();
            signal.connect(move |_| order.lock().push("first"))
        };
        {
            let order = order.clone();
            signal.connect(move |_| order.lock().push("second"));
        }
        signal.disconnect(first);
        {
            let order = order.clone();
            signal.connect(move |_| order.lock().push("third"));
        }

        signal.emit(());
        assert_eq!(*order.lock(), vec!["second", "third"]);
    }

    #[test]
    fn test_slot_may_disconnect_itself_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let id_cell: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));

        let id = {
            let signal = signal.clone();
            let calls = calls.clone();
            let id_cell = id_cell.clone();
            signal.clone().connect(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *id_cell.lock() {
                    signal.disconnect(id);
                }
            })
        };
        *id_cell.lock() = Some(id);

        signal.emit(());
        signal.emit(());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let signal = Signal::<()>::new();
        let reached = Arc::new(AtomicBool::new(false));

        signal.connect(|_| panic!("faulty observer"));
        let reached_clone = reached.clone();
        signal.connect(move |_| reached_clone.store(true, Ordering::SeqCst));

        signal.emit(());
        assert!(reached.load(Ordering::SeqCst));
    }

    #[test]
    fn test_subscription_released_once() {
        let signal = Signal::<i32>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        let sub = signal.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(sub.is_active());
        signal.emit(1);
        sub.release();
        signal.emit(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_subscription_outliving_signal() {
        let sub = {
            let signal = Signal::<()>::new();
            signal.subscribe(|_| {})
        };
        // Signal is gone; releasing must be a no-op.
        sub.release();
    }

    #[test]
    fn test_detached_subscription_keeps_connection() {
        let signal = Signal::<()>::new();
        signal.subscribe(|_| {}).detach();
        assert_eq!(signal.connection_count(), 1);
    }

    #[test]
    fn test_subscription_set_release_all() {
        let a = Signal::<()>::new();
        let b = Signal::<u8>::new();
        let mut set = SubscriptionSet::new();
        set.push(a.subscribe(|_| {}));
        set.push(b.subscribe(|_| {}));
        assert_eq!(set.len(), 2);

        set.release_all();
        assert!(set.is_empty());
        assert_eq!(a.connection_count(), 0);
        assert_eq!(b.connection_count(), 0);
    }
}
