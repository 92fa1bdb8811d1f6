//! UI-affine dispatcher for cross-thread invocations.
//!
//! Kernel state is only touched from the thread running the UI event loop.
//! Other threads hand work to that thread through a [`UiDispatcher`], which
//! offers the two marshaling primitives the desktop kernel needs:
//!
//! - [`post`](UiDispatcher::post): enqueue and return immediately.
//! - [`send`](UiDispatcher::send): enqueue and block until the invocation
//!   has run, returning its result. Called on the owning thread it runs
//!   inline instead, so it can never deadlock on itself.
//!
//! # How It Works
//!
//! 1. Each invocation is wrapped in a [`QueuedInvocation`] and pushed onto an
//!    unbounded channel owned by the dispatcher.
//!
//! 2. The owning thread drains the channel, either by blocking in
//!    [`run`](UiDispatcher::run) or by calling
//!    [`process_pending`](UiDispatcher::process_pending) from a native event
//!    loop after the optional waker fires.
//!
//! 3. Blocking senders wait on a completion pair. If the dispatcher is closed
//!    before their invocation runs, the invocation is dropped and the sender
//!    wakes with [`DispatchError::Abandoned`] instead of waiting forever.
//!
//! # Example
//!
//! ```
//! use horizon_shell_core::UiDispatcher;
//!
//! let dispatcher = UiDispatcher::new();
//! let worker = {
//!     let dispatcher = dispatcher.clone();
//!     std::thread::spawn(move || dispatcher.post(|| println!("on the UI thread")))
//! };
//! worker.join().unwrap().unwrap();
//! assert_eq!(dispatcher.process_pending(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};

use crate::error::{DispatchError, DispatchResult};
use crate::logging::{guard, targets};
use crate::thread_check::ThreadAffinity;

/// Global invocation counter for unique IDs.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<UiDispatcher>> = const { RefCell::new(None) };
}

/// A unique identifier for a queued invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(u64);

impl InvocationId {
    fn next() -> Self {
        Self(NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value of this invocation ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A type-erased queued invocation that can be executed later.
pub struct QueuedInvocation {
    id: InvocationId,
    invoke: Box<dyn FnOnce() + Send>,
    completion: Option<CompletionHandle>,
}

impl QueuedInvocation {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: InvocationId::next(),
            invoke: Box::new(invoke),
            completion: None,
        }
    }

    /// Create a new queued invocation with a completion handle for blocking.
    pub fn with_completion<F>(invoke: F, completion: CompletionHandle) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: InvocationId::next(),
            invoke: Box::new(invoke),
            completion: Some(completion),
        }
    }

    /// The invocation's identifier.
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Execute the invocation.
    ///
    /// A panic inside the invocation is logged and swallowed; the completion
    /// is signalled either way.
    pub fn execute(self) {
        let id = self.id;
        tracing::trace!(target: targets::DISPATCH, invocation = id.as_u64(), "executing invocation");
        guard("queued invocation", self.invoke);
        if let Some(completion) = self.completion {
            completion.signal_done();
        }
    }
}

impl fmt::Debug for QueuedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedInvocation")
            .field("id", &self.id)
            .field("blocking", &self.completion.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionStatus {
    Pending,
    Done,
    Abandoned,
}

struct CompletionState {
    status: Mutex<CompletionStatus>,
    condvar: Condvar,
}

impl CompletionState {
    fn finish(&self, status: CompletionStatus) {
        let mut current = self.status.lock();
        if *current == CompletionStatus::Pending {
            *current = status;
            self.condvar.notify_all();
        }
    }
}

/// A handle for signalling completion of a blocking invocation.
///
/// Dropping the handle without signalling marks the invocation abandoned,
/// which releases the waiting thread.
pub struct CompletionHandle {
    inner: Arc<CompletionState>,
}

impl CompletionHandle {
    fn signal_done(self) {
        self.inner.finish(CompletionStatus::Done);
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        self.inner.finish(CompletionStatus::Abandoned);
    }
}

/// A waiter for blocking on invocation completion.
pub struct CompletionWaiter {
    inner: Arc<CompletionState>,
}

impl CompletionWaiter {
    /// Wait for the invocation to complete.
    ///
    /// # Warning
    ///
    /// Waiting on the thread that is supposed to run the invocation
    /// deadlocks. [`UiDispatcher::send`] avoids this by running inline.
    pub fn wait(self) -> DispatchResult<()> {
        let mut status = self.inner.status.lock();
        while *status == CompletionStatus::Pending {
            self.inner.condvar.wait(&mut status);
        }
        match *status {
            CompletionStatus::Done => Ok(()),
            _ => Err(DispatchError::Abandoned),
        }
    }
}

/// Create a completion handle/waiter pair for blocking invocations.
pub fn completion_pair() -> (CompletionHandle, CompletionWaiter) {
    let state = Arc::new(CompletionState {
        status: Mutex::new(CompletionStatus::Pending),
        condvar: Condvar::new(),
    });
    (
        CompletionHandle {
            inner: state.clone(),
        },
        CompletionWaiter { inner: state },
    )
}

enum DispatchMessage {
    Invoke(QueuedInvocation),
    Wake,
}

type Waker = Arc<dyn Fn() + Send + Sync>;

struct DispatcherInner {
    affinity: ThreadAffinity,
    sender: Sender<DispatchMessage>,
    receiver: Receiver<DispatchMessage>,
    /// Held while enqueueing so `close` cannot race a post past the drain.
    closed: Mutex<bool>,
    waker: Mutex<Option<Waker>>,
}

/// A task queue bound to one UI-affine thread.
///
/// Cloning is cheap; all clones share the same queue.
#[derive(Clone)]
pub struct UiDispatcher {
    inner: Arc<DispatcherInner>,
}

impl Default for UiDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UiDispatcher {
    /// Create a dispatcher bound to the current thread.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            inner: Arc::new(DispatcherInner {
                affinity: ThreadAffinity::current(),
                sender,
                receiver,
                closed: Mutex::new(false),
                waker: Mutex::new(None),
            }),
        }
    }

    /// The dispatcher installed on the calling thread, if any.
    pub fn current() -> Option<UiDispatcher> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Make this dispatcher the calling thread's [`current`](Self::current)
    /// one until the returned scope is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owning thread.
    pub fn install(&self) -> DispatcherScope {
        self.inner
            .affinity
            .assert_same_thread_with_msg("UiDispatcher installed on a foreign thread");
        let previous = CURRENT.with(|current| current.borrow_mut().replace(self.clone()));
        DispatcherScope { previous }
    }

    /// The thread this dispatcher executes on.
    pub fn affinity(&self) -> ThreadAffinity {
        self.inner.affinity
    }

    /// Whether the caller is on the owning thread.
    pub fn is_ui_thread(&self) -> bool {
        self.inner.affinity.is_same_thread()
    }

    /// Whether the dispatcher has been closed.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.lock()
    }

    /// Number of messages waiting to be processed.
    pub fn pending_count(&self) -> usize {
        self.inner.receiver.len()
    }

    /// Install a callback invoked after every enqueue.
    ///
    /// Native event loops use this to wake themselves and then call
    /// [`process_pending`](Self::process_pending).
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.waker.lock() = Some(Arc::new(waker));
    }

    /// Enqueue `f` to run on the owning thread and return immediately.
    pub fn post<F>(&self, f: F) -> DispatchResult<InvocationId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(QueuedInvocation::new(f))
    }

    /// Run `f` on the owning thread and wait for its result.
    ///
    /// On the owning thread `f` runs inline. From any other thread the call
    /// blocks until the invocation has executed, or fails with
    /// [`DispatchError::Abandoned`] if the dispatcher closes first or `f`
    /// panics.
    pub fn send<F, R>(&self, f: F) -> DispatchResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_ui_thread() {
            return Ok(f());
        }

        let slot = Arc::new(Mutex::new(None));
        let result = slot.clone();
        let (handle, waiter) = completion_pair();
        self.enqueue(QueuedInvocation::with_completion(
            move || {
                *result.lock() = Some(f());
            },
            handle,
        ))?;
        waiter.wait()?;
        let value = slot.lock().take();
        value.ok_or(DispatchError::Abandoned)
    }

    /// Run `f` inline on the owning thread, otherwise post it.
    ///
    /// Returns `false` if the work could not be scheduled.
    pub fn marshal<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_ui_thread() {
            f();
            true
        } else {
            self.post(f).is_ok()
        }
    }

    /// Execute every queued invocation without blocking.
    ///
    /// Returns the number of invocations executed.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owning thread.
    pub fn process_pending(&self) -> usize {
        self.inner
            .affinity
            .assert_same_thread_with_msg("UiDispatcher drained from a foreign thread");
        let mut executed = 0;
        loop {
            match self.inner.receiver.try_recv() {
                Ok(DispatchMessage::Invoke(invocation)) => {
                    invocation.execute();
                    executed += 1;
                }
                Ok(DispatchMessage::Wake) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        executed
    }

    /// Block the owning thread, executing invocations until the dispatcher is
    /// closed.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owning thread.
    #[tracing::instrument(skip(self), target = "horizon_shell_core::dispatch", level = "debug")]
    pub fn run(&self) {
        self.inner
            .affinity
            .assert_same_thread_with_msg("UiDispatcher run from a foreign thread");
        tracing::debug!(target: targets::DISPATCH, "dispatcher loop started");
        while !self.is_closed() {
            match self.inner.receiver.recv() {
                Ok(DispatchMessage::Invoke(invocation)) => invocation.execute(),
                Ok(DispatchMessage::Wake) => {}
                Err(_) => break,
            }
        }
        tracing::debug!(target: targets::DISPATCH, "dispatcher loop finished");
    }

    /// Close the dispatcher.
    ///
    /// Pending invocations are discarded (blocked senders wake with
    /// [`DispatchError::Abandoned`]) and later posts fail with
    /// [`DispatchError::ContextClosed`]. Closing twice is a no-op.
    pub fn close(&self) {
        {
            let mut closed = self.inner.closed.lock();
            if *closed {
                return;
            }
            *closed = true;
        }

        let mut discarded = 0usize;
        while let Ok(message) = self.inner.receiver.try_recv() {
            if matches!(message, DispatchMessage::Invoke(_)) {
                discarded += 1;
            }
        }
        if discarded > 0 {
            tracing::debug!(target: targets::DISPATCH, discarded, "discarded pending invocations on close");
        }

        let _ = self.inner.sender.send(DispatchMessage::Wake);
        self.wake();
    }

    fn enqueue(&self, invocation: QueuedInvocation) -> DispatchResult<InvocationId> {
        let id = invocation.id();
        {
            let closed = self.inner.closed.lock();
            if *closed {
                return Err(DispatchError::ContextClosed);
            }
            self.inner
                .sender
                .send(DispatchMessage::Invoke(invocation))
                .map_err(|_| DispatchError::ContextClosed)?;
        }
        tracing::trace!(target: targets::DISPATCH, invocation = id.as_u64(), "invocation queued");
        self.wake();
        Ok(id)
    }

    fn wake(&self) {
        let waker = self.inner.waker.lock().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("affinity", &self.inner.affinity)
            .field("closed", &self.is_closed())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Restores the previously installed dispatcher when dropped.
#[must_use = "the dispatcher is uninstalled when the scope is dropped"]
pub struct DispatcherScope {
    previous: Option<UiDispatcher>,
}

impl Drop for DispatcherScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

static_assertions::assert_impl_all!(UiDispatcher: Send, Sync);
