//! Core systems for Horizon Shell.
//!
//! This crate provides the toolkit-agnostic plumbing the desktop kernel in
//! `horizon-shell` is built on:
//!
//! - **Signal/Slot System**: Type-safe notifications with owned
//!   [`Subscription`] handles that disconnect exactly once
//! - **UI Dispatcher**: A queue bound to the UI-affine thread with `post`
//!   (fire-and-forget) and `send` (block until executed) primitives
//! - **Thread Affinity**: Checks that UI-affine state is touched from its
//!   owning thread
//! - **Property System**: Lock-guarded values with change detection
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_shell_core::Signal;
//!
//! let closed = Signal::<&'static str>::new();
//!
//! let subscription = closed.subscribe(|name| {
//!     println!("{} closed", name);
//! });
//!
//! closed.emit("Root");
//!
//! // Disconnects the slot.
//! subscription.release();
//! ```
//!
//! # Dispatcher Example
//!
//! ```
//! use horizon_shell_core::UiDispatcher;
//!
//! let dispatcher = UiDispatcher::new();
//!
//! let remote = dispatcher.clone();
//! std::thread::spawn(move || {
//!     remote.post(|| println!("runs on the UI thread")).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! dispatcher.process_pending();
//! ```

pub mod dispatch;
mod error;
pub mod logging;
pub mod property;
pub mod signal;
pub mod thread_check;

pub use dispatch::{
    CompletionHandle, CompletionWaiter, DispatcherScope, InvocationId, QueuedInvocation,
    UiDispatcher, completion_pair,
};
pub use error::{DispatchError, DispatchResult};
pub use property::{ObservableProperty, Property};
pub use signal::{ConnectionId, Signal, Subscription, SubscriptionSet};
pub use thread_check::ThreadAffinity;
