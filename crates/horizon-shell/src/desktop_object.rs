//! The desktop object lifecycle state machine.
//!
//! Windows, workspaces, shelves and dialog boxes all share one lifecycle:
//!
//! ```text
//! Created ──open()──▶ Opening ──▶ Open ──close()──▶ Closing ──▶ Closed
//!                                  ▲                   │
//!                                  └──── cancelled ────┘
//! ```
//!
//! A concrete object implements [`DesktopObject`], which supplies the state
//! holder ([`DesktopObjectCore`]), the view factory method and the
//! overridable hooks. The lifecycle operations themselves live on
//! [`DesktopObjectExt`], implemented for `Arc<T>` so that view callbacks can
//! hold weak references back to the object.
//!
//! # Closing
//!
//! [`close_with`](DesktopObjectExt::close_with) is the single closing entry
//! point. [`DesktopObject::can_close`] must answer without user interaction;
//! [`DesktopObject::prepare_close`] may interact (for example to ask about
//! unsaved changes). Batch operations such as application quit try the
//! non-interactive path first.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use horizon_shell_core::logging::guard;
use horizon_shell_core::{Property, Signal, SubscriptionSet, ThreadAffinity};
use parking_lot::Mutex;

use crate::error::{Result, ShellError};
use crate::logging::targets;
use crate::view::DesktopObjectView;

/// Lifecycle state of a desktop object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DesktopObjectState {
    /// Constructed but not yet opened.
    Created,
    /// `open` is in progress; the view is being created.
    Opening,
    /// Fully open.
    Open,
    /// `close` is in progress and may still be cancelled.
    Closing,
    /// Closed. Terminal.
    Closed,
}

/// Why an object is closing.
///
/// Reasons combine with `|`: a workspace closed because its window is
/// closing for application quit carries
/// `APPLICATION_QUIT | PARENT_CLOSING`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseReason(u8);

impl CloseReason {
    /// Closed programmatically.
    pub const PROGRAM: CloseReason = CloseReason(1 << 0);

    /// Closed through the user interface (e.g. the view's close box).
    pub const USER_INTERFACE: CloseReason = CloseReason(1 << 1);

    /// Closed because the application is quitting.
    pub const APPLICATION_QUIT: CloseReason = CloseReason(1 << 2);

    /// Closed because the owning object is closing.
    pub const PARENT_CLOSING: CloseReason = CloseReason(1 << 3);

    /// Check if every flag in `reason` is set.
    pub fn has(&self, reason: CloseReason) -> bool {
        (self.0 & reason.0) == reason.0
    }

    /// Raw bit representation.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for CloseReason {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        CloseReason(self.0 | rhs.0)
    }
}

impl BitOrAssign for CloseReason {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(CloseReason, &str); 4] = [
            (CloseReason::PROGRAM, "Program"),
            (CloseReason::USER_INTERFACE, "UserInterface"),
            (CloseReason::APPLICATION_QUIT, "ApplicationQuit"),
            (CloseReason::PARENT_CLOSING, "ParentClosing"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.has(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "CloseReason(empty)")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

/// Whether a close may interact with the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserInteraction {
    /// Prompts are allowed.
    Allowed,
    /// The close must be decided without prompting.
    NotAllowed,
}

/// The result of a close attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseOutcome {
    /// The object reached `Closed`.
    Closed,
    /// The object declined (`can_close`/`prepare_close` said no).
    Refused,
    /// A `closing` listener cancelled the close.
    Cancelled,
}

impl CloseOutcome {
    /// Whether the object closed.
    pub fn is_closed(self) -> bool {
        self == CloseOutcome::Closed
    }
}

/// Arguments of the cancellable `closing` notification.
///
/// Clones share the cancel flag, so a collection can republish the same
/// request to its own listeners.
#[derive(Debug, Clone)]
pub struct ClosingEventArgs {
    reason: CloseReason,
    interaction: UserInteraction,
    cancel: Arc<AtomicBool>,
}

impl ClosingEventArgs {
    /// Create closing arguments.
    pub fn new(reason: CloseReason, interaction: UserInteraction) -> Self {
        Self {
            reason,
            interaction,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Why the object is closing.
    pub fn reason(&self) -> CloseReason {
        self.reason
    }

    /// Whether listeners may interact with the user.
    pub fn interaction(&self) -> UserInteraction {
        self.interaction
    }

    /// Request that the close be cancelled.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether any listener cancelled the close.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Arguments of the `closed` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedEventArgs {
    /// Why the object closed.
    pub reason: CloseReason,
}

/// State and notifications shared by every desktop object.
///
/// `V` is the object's view type. The view is held only between a
/// successful open and close; accessors clone it out so no lock is held
/// while the view runs.
pub struct DesktopObjectCore<V: ?Sized> {
    kind: &'static str,
    name: Option<String>,
    title: Property<String>,
    state: Mutex<DesktopObjectState>,
    active: AtomicBool,
    visible: AtomicBool,
    view: Mutex<Option<Arc<V>>>,
    view_subscriptions: Mutex<SubscriptionSet>,
    member: AtomicBool,
    disposed: AtomicBool,
    /// The thread that opened the object.
    affinity: OnceLock<ThreadAffinity>,

    opening: Signal<()>,
    opened: Signal<()>,
    closing: Signal<ClosingEventArgs>,
    closed: Signal<ClosedEventArgs>,
    title_changed: Signal<String>,
    visible_changed: Signal<bool>,
    active_changed: Signal<bool>,
    internal_active_changed: Signal<bool>,
}

impl<V: DesktopObjectView + ?Sized> DesktopObjectCore<V> {
    /// Create the core for an object of the given kind.
    ///
    /// `kind` names the object type in log records and errors.
    pub fn new(kind: &'static str, name: Option<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            name,
            title: Property::new(title.into()),
            state: Mutex::new(DesktopObjectState::Created),
            active: AtomicBool::new(false),
            visible: AtomicBool::new(false),
            view: Mutex::new(None),
            view_subscriptions: Mutex::new(SubscriptionSet::new()),
            member: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            affinity: OnceLock::new(),
            opening: Signal::new(),
            opened: Signal::new(),
            closing: Signal::new(),
            closed: Signal::new(),
            title_changed: Signal::new(),
            visible_changed: Signal::new(),
            active_changed: Signal::new(),
            internal_active_changed: Signal::new(),
        }
    }

    /// The object type, e.g. `"Workspace"`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The unique name, if the object is addressable by name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The current title.
    pub fn title(&self) -> String {
        self.title.get()
    }

    /// Set the title, updating the view and notifying listeners if it
    /// changed.
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        if self.title.set(title.clone()) {
            if let Some(view) = self.view() {
                view.set_title(&title);
            }
            self.title_changed.emit(title);
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> DesktopObjectState {
        *self.state.lock()
    }

    /// Whether the view reports the object as active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether the view reports the object as visible.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// The view, while the object is open.
    pub fn view(&self) -> Option<Arc<V>> {
        self.view.lock().clone()
    }

    /// Whether the object has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Human-readable label for log records.
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{} '{}'", self.kind, name),
            None => format!("{} \"{}\"", self.kind, self.title()),
        }
    }

    /// Emitted after the state becomes `Opening`.
    pub fn opening(&self) -> &Signal<()> {
        &self.opening
    }

    /// Emitted after the state becomes `Open`.
    pub fn opened(&self) -> &Signal<()> {
        &self.opened
    }

    /// Emitted while `Closing`; listeners may cancel.
    pub fn closing(&self) -> &Signal<ClosingEventArgs> {
        &self.closing
    }

    /// Emitted after the state becomes `Closed`.
    pub fn closed(&self) -> &Signal<ClosedEventArgs> {
        &self.closed
    }

    /// Emitted when the title changes.
    pub fn title_changed(&self) -> &Signal<String> {
        &self.title_changed
    }

    /// Emitted when visibility changes.
    pub fn visible_changed(&self) -> &Signal<bool> {
        &self.visible_changed
    }

    /// Emitted when activation changes, after the owning collection has
    /// updated its tracking.
    pub fn active_changed(&self) -> &Signal<bool> {
        &self.active_changed
    }

    /// Emitted before [`active_changed`](Self::active_changed); the owning
    /// collection listens here and decides when the public notification
    /// fires. Without a listener the public notification fires directly.
    pub(crate) fn internal_active_changed(&self) -> &Signal<bool> {
        &self.internal_active_changed
    }

    /// Debug builds panic when an opened object is driven from a thread
    /// other than the one that opened it.
    pub(crate) fn debug_assert_ui_thread(&self) {
        if let Some(affinity) = self.affinity.get() {
            affinity.debug_assert_same_thread();
        }
    }

    pub(crate) fn require_state(
        &self,
        operation: &'static str,
        valid: &[DesktopObjectState],
    ) -> Result<()> {
        let state = self.state();
        if valid.contains(&state) {
            Ok(())
        } else {
            Err(ShellError::invalid_state(operation, self.kind, state))
        }
    }

    pub(crate) fn set_state(&self, state: DesktopObjectState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        tracing::debug!(
            target: targets::OBJECT,
            object = %self.describe(),
            from = ?previous,
            to = ?state,
            "state changed"
        );
    }

    pub(crate) fn set_active(&self, active: bool) {
        if self.active.swap(active, Ordering::SeqCst) != active {
            tracing::trace!(target: targets::OBJECT, object = %self.describe(), active, "active changed");
            if self.internal_active_changed.connection_count() == 0 {
                self.active_changed.emit(active);
            } else {
                self.internal_active_changed.emit(active);
            }
        }
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        if self.visible.swap(visible, Ordering::SeqCst) != visible {
            tracing::trace!(target: targets::OBJECT, object = %self.describe(), visible, "visible changed");
            self.visible_changed.emit(visible);
        }
    }

    /// Fire the public activation notification with the current value.
    pub(crate) fn raise_active_changed(&self) {
        self.active_changed.emit(self.is_active());
    }

    /// Claim membership for a collection. Returns `false` if already claimed.
    pub(crate) fn claim_membership(&self) -> bool {
        self.member
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn release_membership(&self) {
        self.member.store(false, Ordering::SeqCst);
    }

    /// Show the view, then activate it. An object must be visible to
    /// become active.
    pub(crate) fn show_and_activate(&self) {
        if let Some(view) = self.view() {
            view.show();
            view.activate();
        }
    }

    fn attach_view(&self, view: Arc<V>, subscriptions: SubscriptionSet) {
        *self.view_subscriptions.lock() = subscriptions;
        *self.view.lock() = Some(view);
    }

    /// Unhook from the view and dispose it, logging failures.
    fn detach_and_dispose_view(&self) {
        let mut subscriptions = std::mem::take(&mut *self.view_subscriptions.lock());
        subscriptions.release_all();

        let view = self.view.lock().take();
        if let Some(view) = view {
            match guard("view dispose", || view.dispose()) {
                Some(Ok(())) => {}
                Some(Err(err)) => tracing::error!(
                    target: targets::OBJECT,
                    object = %self.describe(),
                    error = %err,
                    "view failed to dispose"
                ),
                None => {}
            }
        }
    }
}

impl<V: ?Sized> fmt::Debug for DesktopObjectCore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopObjectCore")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("title", &self.title.get())
            .field("state", &*self.state.lock())
            .field("active", &self.active.load(Ordering::SeqCst))
            .field("visible", &self.visible.load(Ordering::SeqCst))
            .finish()
    }
}

/// A long-lived UI object with a view and a lifecycle.
///
/// Implementors provide the core and the view, and may override the hooks.
/// The lifecycle itself is driven through [`DesktopObjectExt`].
pub trait DesktopObject: Send + Sync + 'static {
    /// The view type this object creates.
    type View: DesktopObjectView + ?Sized;

    /// The shared state holder.
    fn core(&self) -> &DesktopObjectCore<Self::View>;

    /// Create the view. Called once, while `Opening`.
    fn create_view(&self) -> Result<Arc<Self::View>>;

    /// Called by `open` before any state change. An error aborts the open;
    /// the object never reaches `Opening`.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Whether the object can close without interacting with the user.
    ///
    /// Must be conservative and answer immediately.
    fn can_close(&self) -> bool {
        true
    }

    /// Prepare to close, interacting with the user if necessary.
    ///
    /// Returning `false` aborts the close. The default activates the object
    /// (so the user has context) and refuses if [`can_close`](Self::can_close)
    /// is false.
    fn prepare_close(&self, _reason: CloseReason) -> bool {
        if self.can_close() {
            return true;
        }
        self.core().show_and_activate();
        false
    }

    /// Called after the state becomes `Open`, before `opened` fires.
    fn on_opened(&self) {}

    /// Release resources owned by the object. Called once, from dispose.
    fn on_disposing(&self) {}

    /// Convenience accessor for the core's state.
    fn state(&self) -> DesktopObjectState {
        self.core().state()
    }

    /// Convenience accessor for the core's name.
    fn name(&self) -> Option<&str> {
        self.core().name()
    }

    /// Convenience accessor for the core's title.
    fn title(&self) -> String {
        self.core().title()
    }

    /// Convenience accessor for the core's active flag.
    fn is_active(&self) -> bool {
        self.core().is_active()
    }

    /// Convenience accessor for the core's visible flag.
    fn is_visible(&self) -> bool {
        self.core().is_visible()
    }
}

/// Lifecycle operations on a shared desktop object.
pub trait DesktopObjectExt {
    /// Open the object: initialize, create and open the view.
    ///
    /// Normally called by the owning collection.
    fn open(&self) -> Result<()>;

    /// Close, allowing user interaction, for [`CloseReason::PROGRAM`].
    fn close(&self) -> Result<bool>;

    /// Close with explicit interaction permission and reason.
    ///
    /// Fails if the object is not `Open`.
    fn close_with(&self, interaction: UserInteraction, reason: CloseReason)
    -> Result<CloseOutcome>;

    /// Show and activate the view. Only valid while `Open`.
    fn activate(&self) -> Result<()>;

    /// Whether the object could close without interaction. Valid while
    /// `Open` or `Closing`.
    fn query_close_ready(&self) -> Result<bool>;

    /// Dispose the object. Idempotent and never panics outward.
    fn dispose(&self);
}

impl<T: DesktopObject> DesktopObjectExt for Arc<T> {
    fn open(&self) -> Result<()> {
        open_object(self)
    }

    fn close(&self) -> Result<bool> {
        Ok(self
            .close_with(UserInteraction::Allowed, CloseReason::PROGRAM)?
            .is_closed())
    }

    fn close_with(
        &self,
        interaction: UserInteraction,
        reason: CloseReason,
    ) -> Result<CloseOutcome> {
        self.core().debug_assert_ui_thread();
        self.core()
            .require_state("close", &[DesktopObjectState::Open])?;
        Ok(close_object(self, interaction, reason))
    }

    fn activate(&self) -> Result<()> {
        self.core().debug_assert_ui_thread();
        self.core()
            .require_state("activate", &[DesktopObjectState::Open])?;
        self.core().show_and_activate();
        Ok(())
    }

    fn query_close_ready(&self) -> Result<bool> {
        self.core().require_state(
            "query_close_ready",
            &[DesktopObjectState::Open, DesktopObjectState::Closing],
        )?;
        Ok(self.can_close())
    }

    fn dispose(&self) {
        dispose_object(&**self);
    }
}

#[tracing::instrument(skip_all, target = "horizon_shell::object", fields(object = %obj.core().describe()))]
fn open_object<T: DesktopObject>(obj: &Arc<T>) -> Result<()> {
    let core = obj.core();
    core.require_state("open", &[DesktopObjectState::Created])?;
    core.affinity.get_or_init(ThreadAffinity::current);

    obj.initialize()?;

    core.set_state(DesktopObjectState::Opening);
    core.opening.emit(());

    if let Err(err) = create_and_open_view(obj) {
        tracing::error!(
            target: targets::OBJECT,
            object = %core.describe(),
            error = %err,
            "view failed to open; rolling back"
        );
        core.detach_and_dispose_view();
        core.set_active(false);
        core.set_state(DesktopObjectState::Closed);
        core.closed.emit(ClosedEventArgs {
            reason: CloseReason::PROGRAM,
        });
        dispose_object(&**obj);
        return Err(err);
    }

    core.set_state(DesktopObjectState::Open);
    obj.on_opened();
    core.opened.emit(());
    Ok(())
}

fn create_and_open_view<T: DesktopObject>(obj: &Arc<T>) -> Result<()> {
    let core = obj.core();
    let view = obj.create_view()?;
    view.set_title(&core.title());

    let mut subscriptions = SubscriptionSet::new();
    let weak = Arc::downgrade(obj);
    subscriptions.push(view.active_changed().subscribe({
        let weak = weak.clone();
        move |&active| {
            if let Some(obj) = weak.upgrade() {
                obj.core().set_active(active);
            }
        }
    }));
    subscriptions.push(view.visible_changed().subscribe({
        let weak = weak.clone();
        move |&visible| {
            if let Some(obj) = weak.upgrade() {
                obj.core().set_visible(visible);
            }
        }
    }));
    subscriptions.push(view.close_requested().subscribe(move |_| {
        let Some(obj) = weak.upgrade() else { return };
        if obj.core().state() != DesktopObjectState::Open {
            return;
        }
        let outcome = close_object(&obj, UserInteraction::Allowed, CloseReason::USER_INTERFACE);
        tracing::debug!(
            target: targets::OBJECT,
            object = %obj.core().describe(),
            ?outcome,
            "close requested by view"
        );
    }));

    core.attach_view(view.clone(), subscriptions);
    view.open()
}

#[tracing::instrument(skip_all, target = "horizon_shell::object", fields(object = %obj.core().describe(), ?interaction, ?reason))]
pub(crate) fn close_object<T: DesktopObject>(
    obj: &Arc<T>,
    interaction: UserInteraction,
    reason: CloseReason,
) -> CloseOutcome {
    let core = obj.core();

    if interaction == UserInteraction::NotAllowed
        && !guard("can_close", || obj.can_close()).unwrap_or(false)
    {
        tracing::debug!(target: targets::OBJECT, object = %core.describe(), "cannot close without interaction");
        return CloseOutcome::Refused;
    }

    core.set_state(DesktopObjectState::Closing);

    let args = ClosingEventArgs::new(reason, interaction);
    core.closing.emit_ref(&args);
    if args.is_cancelled() {
        core.set_state(DesktopObjectState::Open);
        return CloseOutcome::Cancelled;
    }
    if !guard("prepare_close", || obj.prepare_close(reason)).unwrap_or(false) {
        core.set_state(DesktopObjectState::Open);
        return CloseOutcome::Refused;
    }

    // Unhook first so the view's own deactivation during disposal is not
    // reported.
    let mut subscriptions = std::mem::take(&mut *core.view_subscriptions.lock());
    subscriptions.release_all();
    core.set_active(false);
    core.detach_and_dispose_view();

    core.set_state(DesktopObjectState::Closed);
    core.closed.emit(ClosedEventArgs { reason });

    dispose_object(&**obj);
    CloseOutcome::Closed
}

pub(crate) fn dispose_object<T: DesktopObject>(obj: &T) {
    let core = obj.core();
    if core.disposed.swap(true, Ordering::SeqCst) {
        return;
    }
    tracing::trace!(target: targets::OBJECT, object = %core.describe(), "disposing");
    guard("on_disposing", || obj.on_disposing());
    // Still set if the object was disposed without ever closing.
    core.detach_and_dispose_view();
}
