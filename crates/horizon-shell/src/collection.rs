//! Ordered, name-keyed collections of desktop objects.
//!
//! A [`DesktopObjectCollection`] owns the bookkeeping for its members:
//! membership, lookup by name and the republishing of each member's
//! lifecycle notifications as collection-level notifications.
//!
//! # Ordering
//!
//! A member is added when it fires `opening` and removed when it fires
//! `closed`. Listeners enumerating the collection during `item_opening`
//! already see the new member; during `item_closing` they still see the
//! closing one.
//!
//! # Activation
//!
//! Each member's internal activation change is routed through the
//! collection's [`ActivationPolicy`] before its public `active_changed`
//! fires. [`ActivationPolicy::Exclusive`] tracks a single active member, the
//! way a window tracks its active workspace.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use horizon_shell_core::logging::guard;
use horizon_shell_core::{Signal, SubscriptionSet};
use parking_lot::Mutex;

use crate::desktop_object::{
    ClosingEventArgs, CloseReason, DesktopObject, DesktopObjectExt, DesktopObjectState,
};
use crate::error::{Result, ShellError};
use crate::logging::targets;

/// How a collection reacts to a member's internal activation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// Forward the change to the member's public notification.
    Forward,
    /// Track one active member. Activating a member re-notifies the
    /// previously active one before the new one; a deactivation is reported
    /// when the successor activates, or immediately if the member is
    /// closing.
    Exclusive,
}

/// Arguments naming the member a collection notification concerns.
pub struct ItemEventArgs<T> {
    /// The member.
    pub item: Arc<T>,
}

impl<T> Clone for ItemEventArgs<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
        }
    }
}

/// Arguments of `item_closing`. Cancelling here cancels the member's close.
pub struct ClosingItemEventArgs<T> {
    /// The member.
    pub item: Arc<T>,
    /// The member's closing arguments.
    pub closing: ClosingEventArgs,
}

/// Arguments of `item_closed`.
pub struct ClosedItemEventArgs<T> {
    /// The member, now closed.
    pub item: Arc<T>,
    /// Why it closed.
    pub reason: CloseReason,
}

struct Members<T> {
    ordered: Vec<Arc<T>>,
    by_name: HashMap<String, Arc<T>>,
    /// Names of members still inside `open`, before their `opening` fired.
    reserved: HashSet<String>,
    subscriptions: HashMap<usize, SubscriptionSet>,
}

impl<T> Default for Members<T> {
    fn default() -> Self {
        Self {
            ordered: Vec::new(),
            by_name: HashMap::new(),
            reserved: HashSet::new(),
            subscriptions: HashMap::new(),
        }
    }
}

struct CollectionInner<T> {
    label: &'static str,
    policy: ActivationPolicy,
    members: Mutex<Members<T>>,
    active: Mutex<Option<Arc<T>>>,

    item_opening: Signal<ItemEventArgs<T>>,
    item_opened: Signal<ItemEventArgs<T>>,
    item_closing: Signal<ClosingItemEventArgs<T>>,
    item_closed: Signal<ClosedItemEventArgs<T>>,
    item_visibility_changed: Signal<ItemEventArgs<T>>,
    item_activation_changed: Signal<ItemEventArgs<T>>,
}

/// A collection of desktop objects of one type.
///
/// Cloning yields another handle to the same collection.
pub struct DesktopObjectCollection<T: DesktopObject> {
    inner: Arc<CollectionInner<T>>,
}

impl<T: DesktopObject> Clone for DesktopObjectCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn key_of<T>(item: &Arc<T>) -> usize {
    Arc::as_ptr(item) as *const () as usize
}

impl<T: DesktopObject> DesktopObjectCollection<T> {
    /// Create an empty collection. `label` names it in log records.
    pub fn new(label: &'static str, policy: ActivationPolicy) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                label,
                policy,
                members: Mutex::new(Members::default()),
                active: Mutex::new(None),
                item_opening: Signal::new(),
                item_opened: Signal::new(),
                item_closing: Signal::new(),
                item_closed: Signal::new(),
                item_visibility_changed: Signal::new(),
                item_activation_changed: Signal::new(),
            }),
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.members.lock().ordered.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `item` is a member.
    pub fn contains(&self, item: &Arc<T>) -> bool {
        self.inner
            .members
            .lock()
            .ordered
            .iter()
            .any(|member| Arc::ptr_eq(member, item))
    }

    /// Whether a member has this name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.inner.members.lock().by_name.contains_key(name)
    }

    /// Look up a member by name.
    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        self.inner
            .members
            .lock()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ShellError::NotFound(name.to_string()))
    }

    /// Snapshot of the members in insertion order.
    pub fn items(&self) -> Vec<Arc<T>> {
        self.inner.members.lock().ordered.clone()
    }

    /// The active member under [`ActivationPolicy::Exclusive`].
    pub fn active_item(&self) -> Option<Arc<T>> {
        self.inner.active.lock().clone()
    }

    /// The activation policy.
    pub fn policy(&self) -> ActivationPolicy {
        self.inner.policy
    }

    /// Emitted when a member starts opening, after it was added.
    pub fn item_opening(&self) -> &Signal<ItemEventArgs<T>> {
        &self.inner.item_opening
    }

    /// Emitted when a member has opened.
    pub fn item_opened(&self) -> &Signal<ItemEventArgs<T>> {
        &self.inner.item_opened
    }

    /// Emitted when a member starts closing; may cancel.
    pub fn item_closing(&self) -> &Signal<ClosingItemEventArgs<T>> {
        &self.inner.item_closing
    }

    /// Emitted when a member has closed, after it was removed.
    pub fn item_closed(&self) -> &Signal<ClosedItemEventArgs<T>> {
        &self.inner.item_closed
    }

    /// Emitted when a member's visibility changes.
    pub fn item_visibility_changed(&self) -> &Signal<ItemEventArgs<T>> {
        &self.inner.item_visibility_changed
    }

    /// Emitted when a member's activation changes.
    pub fn item_activation_changed(&self) -> &Signal<ItemEventArgs<T>> {
        &self.inner.item_activation_changed
    }

    /// Wire `item` into the collection and open it.
    ///
    /// Fails without side effects if the item already belongs to a
    /// collection or its name is taken. The name stays reserved while the
    /// item opens, so a sibling opened from its `initialize` cannot take it.
    /// Errors from the item's own open propagate after the wiring is undone.
    #[tracing::instrument(skip_all, target = "horizon_shell::collection", fields(collection = self.inner.label, item = %item.core().describe()))]
    pub fn open(&self, item: &Arc<T>) -> Result<()> {
        let core = item.core();
        let name = core.name().map(str::to_string);
        {
            let mut members = self.inner.members.lock();
            if let Some(name) = &name {
                if members.by_name.contains_key(name) || members.reserved.contains(name) {
                    return Err(ShellError::DuplicateName(name.clone()));
                }
            }
            if !core.claim_membership() {
                return Err(ShellError::AlreadyMember(core.describe()));
            }
            if let Some(name) = &name {
                members.reserved.insert(name.clone());
            }
        }

        let subscriptions = self.wire(item);
        self.inner
            .members
            .lock()
            .subscriptions
            .insert(key_of(item), subscriptions);

        if let Err(err) = item.open() {
            // A view failure after opening already removed the item via
            // `closed`; an initialize failure never added it.
            let leftover = {
                let mut members = self.inner.members.lock();
                if let Some(name) = &name {
                    members.reserved.remove(name);
                }
                members.subscriptions.remove(&key_of(item))
            };
            if let Some(mut subscriptions) = leftover {
                subscriptions.release_all();
            }
            if core.state() == DesktopObjectState::Created {
                core.release_membership();
            }
            return Err(err);
        }
        Ok(())
    }

    fn wire(&self, item: &Arc<T>) -> SubscriptionSet {
        let core = item.core();
        let weak_item = Arc::downgrade(item);
        let weak_inner = Arc::downgrade(&self.inner);
        let mut set = SubscriptionSet::new();

        macro_rules! upgrade {
            ($weak_item:ident, $weak_inner:ident) => {
                match ($weak_item.upgrade(), $weak_inner.upgrade()) {
                    (Some(item), Some(inner)) => (item, DesktopObjectCollection { inner }),
                    _ => return,
                }
            };
        }

        set.push(core.opening().subscribe({
            let (weak_item, weak_inner) = (weak_item.clone(), weak_inner.clone());
            move |_| {
                let (item, collection) = upgrade!(weak_item, weak_inner);
                collection.add(&item);
                collection
                    .inner
                    .item_opening
                    .emit(ItemEventArgs { item });
            }
        }));
        set.push(core.opened().subscribe({
            let (weak_item, weak_inner) = (weak_item.clone(), weak_inner.clone());
            move |_| {
                let (item, collection) = upgrade!(weak_item, weak_inner);
                collection.inner.item_opened.emit(ItemEventArgs { item });
            }
        }));
        set.push(core.closing().subscribe({
            let (weak_item, weak_inner) = (weak_item.clone(), weak_inner.clone());
            move |args| {
                let (item, collection) = upgrade!(weak_item, weak_inner);
                collection.inner.item_closing.emit(ClosingItemEventArgs {
                    item,
                    closing: args.clone(),
                });
            }
        }));
        set.push(core.closed().subscribe({
            let (weak_item, weak_inner) = (weak_item.clone(), weak_inner.clone());
            move |args| {
                let (item, collection) = upgrade!(weak_item, weak_inner);
                collection.remove(&item);
                collection.inner.item_closed.emit(ClosedItemEventArgs {
                    item,
                    reason: args.reason,
                });
            }
        }));
        set.push(core.visible_changed().subscribe({
            let (weak_item, weak_inner) = (weak_item.clone(), weak_inner.clone());
            move |_| {
                let (item, collection) = upgrade!(weak_item, weak_inner);
                collection
                    .inner
                    .item_visibility_changed
                    .emit(ItemEventArgs { item });
            }
        }));
        set.push(core.active_changed().subscribe({
            let (weak_item, weak_inner) = (weak_item.clone(), weak_inner.clone());
            move |_| {
                let (item, collection) = upgrade!(weak_item, weak_inner);
                collection
                    .inner
                    .item_activation_changed
                    .emit(ItemEventArgs { item });
            }
        }));
        set.push(core.internal_active_changed().subscribe(move |&active| {
            let (item, collection) = upgrade!(weak_item, weak_inner);
            collection.on_internal_active_changed(&item, active);
        }));
        set
    }

    fn add(&self, item: &Arc<T>) {
        let mut members = self.inner.members.lock();
        if let Some(name) = item.core().name() {
            members.reserved.remove(name);
            members.by_name.insert(name.to_string(), item.clone());
        }
        members.ordered.push(item.clone());
        tracing::debug!(
            target: targets::COLLECTION,
            collection = self.inner.label,
            item = %item.core().describe(),
            count = members.ordered.len(),
            "member added"
        );
    }

    fn remove(&self, item: &Arc<T>) {
        let subscriptions = {
            let mut members = self.inner.members.lock();
            members.ordered.retain(|member| !Arc::ptr_eq(member, item));
            if let Some(name) = item.core().name() {
                members.by_name.remove(name);
            }
            members.subscriptions.remove(&key_of(item))
        };
        if let Some(mut subscriptions) = subscriptions {
            subscriptions.release_all();
        }
        item.core().release_membership();

        let was_active = {
            let mut active = self.inner.active.lock();
            match &*active {
                Some(current) if Arc::ptr_eq(current, item) => {
                    *active = None;
                    true
                }
                _ => false,
            }
        };
        tracing::debug!(
            target: targets::COLLECTION,
            collection = self.inner.label,
            item = %item.core().describe(),
            was_active,
            "member removed"
        );
    }

    fn on_internal_active_changed(&self, item: &Arc<T>, active: bool) {
        let core = item.core();
        match self.inner.policy {
            ActivationPolicy::Forward => core.raise_active_changed(),
            ActivationPolicy::Exclusive if active => {
                let last = self.inner.active.lock().replace(item.clone());
                if let Some(last) = last {
                    if !Arc::ptr_eq(&last, item) {
                        last.core().raise_active_changed();
                    }
                }
                core.raise_active_changed();
            }
            ActivationPolicy::Exclusive => {
                if core.state() == DesktopObjectState::Closing {
                    let mut tracked = self.inner.active.lock();
                    if tracked.as_ref().is_some_and(|current| Arc::ptr_eq(current, item)) {
                        *tracked = None;
                    }
                    drop(tracked);
                    core.raise_active_changed();
                }
            }
        }
    }

    /// Dispose every member, then clear the bookkeeping.
    ///
    /// Failures while disposing a member are logged, not propagated.
    pub fn dispose(&self) {
        let (items, subscriptions) = {
            let mut members = self.inner.members.lock();
            let items = std::mem::take(&mut members.ordered);
            members.by_name.clear();
            members.reserved.clear();
            (items, std::mem::take(&mut members.subscriptions))
        };
        for (_, mut set) in subscriptions {
            set.release_all();
        }
        for item in &items {
            if guard("dispose collection member", || item.dispose()).is_none() {
                tracing::error!(
                    target: targets::COLLECTION,
                    collection = self.inner.label,
                    item = %item.core().describe(),
                    "member failed to dispose"
                );
            }
            item.core().release_membership();
        }
        *self.inner.active.lock() = None;
        tracing::debug!(
            target: targets::COLLECTION,
            collection = self.inner.label,
            disposed = items.len(),
            "collection disposed"
        );
    }
}

impl<T: DesktopObject> fmt::Debug for DesktopObjectCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopObjectCollection")
            .field("label", &self.inner.label)
            .field("policy", &self.inner.policy)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop_object::{CloseOutcome, DesktopObjectCore, UserInteraction};
    use crate::headless::{HeadlessView, ViewKind};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Item {
        core: DesktopObjectCore<HeadlessView>,
        view: Arc<HeadlessView>,
        fail_initialize: bool,
        closable: AtomicBool,
        sibling: Mutex<Option<(DesktopObjectCollection<Item>, Arc<Item>)>>,
        sibling_rejected: Mutex<Option<bool>>,
    }

    impl Item {
        fn named(name: &str) -> Arc<Self> {
            Self::build(Some(name), false, HeadlessView::new(ViewKind::Workspace))
        }

        fn build(name: Option<&str>, fail_initialize: bool, view: Arc<HeadlessView>) -> Arc<Self> {
            Arc::new(Self {
                core: DesktopObjectCore::new(
                    "Item",
                    name.map(str::to_string),
                    name.unwrap_or("untitled"),
                ),
                view,
                fail_initialize,
                closable: AtomicBool::new(true),
                sibling: Mutex::new(None),
                sibling_rejected: Mutex::new(None),
            })
        }
    }

    impl DesktopObject for Item {
        type View = HeadlessView;

        fn core(&self) -> &DesktopObjectCore<HeadlessView> {
            &self.core
        }

        fn create_view(&self) -> Result<Arc<HeadlessView>> {
            Ok(self.view.clone())
        }

        fn initialize(&self) -> Result<()> {
            let sibling = self.sibling.lock().take();
            if let Some((collection, sibling)) = sibling {
                let rejected = matches!(collection.open(&sibling), Err(ShellError::DuplicateName(_)));
                *self.sibling_rejected.lock() = Some(rejected);
            }
            if self.fail_initialize {
                Err(ShellError::Initialization("no".into()))
            } else {
                Ok(())
            }
        }

        fn can_close(&self) -> bool {
            self.closable.load(Ordering::SeqCst)
        }
    }

    fn forward() -> DesktopObjectCollection<Item> {
        DesktopObjectCollection::new("items", ActivationPolicy::Forward)
    }

    #[test]
    fn test_member_visible_during_opening_and_closing() {
        let collection = forward();
        let observations = Arc::new(Mutex::new(Vec::new()));
        {
            let c = collection.clone();
            let obs = observations.clone();
            collection.item_opening().connect(move |args| {
                obs.lock().push(("opening", c.contains(&args.item), c.len()));
            });
        }
        {
            let c = collection.clone();
            let obs = observations.clone();
            collection.item_closing().connect(move |args| {
                obs.lock().push(("closing", c.contains(&args.item), c.len()));
            });
        }
        {
            let c = collection.clone();
            let obs = observations.clone();
            collection.item_closed().connect(move |args| {
                obs.lock().push(("closed", c.contains(&args.item), c.len()));
            });
        }

        let item = Item::named("a");
        collection.open(&item).unwrap();
        item.close().unwrap();

        assert_eq!(
            *observations.lock(),
            vec![("opening", true, 1), ("closing", true, 1), ("closed", false, 0)]
        );
    }

    #[test]
    fn test_duplicate_name_rejected_and_collection_unchanged() {
        let collection = forward();
        collection.open(&Item::named("editor")).unwrap();

        let dup = Item::named("editor");
        assert!(matches!(collection.open(&dup), Err(ShellError::DuplicateName(n)) if n == "editor"));
        assert_eq!(collection.len(), 1);
        assert_eq!(dup.state(), DesktopObjectState::Created);
    }

    #[test]
    fn test_name_reserved_while_opening() {
        let collection = forward();
        let first = Item::named("editor");
        let sibling = Item::named("editor");
        *first.sibling.lock() = Some((collection.clone(), sibling.clone()));

        collection.open(&first).unwrap();

        assert_eq!(*first.sibling_rejected.lock(), Some(true));
        assert_eq!(sibling.state(), DesktopObjectState::Created);
        assert_eq!(collection.len(), 1);
        assert!(Arc::ptr_eq(&collection.get("editor").unwrap(), &first));
    }

    #[test]
    fn test_failed_open_releases_reserved_name() {
        let collection = forward();
        let failing = Item::build(Some("x"), true, HeadlessView::new(ViewKind::Workspace));
        assert!(collection.open(&failing).is_err());
        collection.open(&Item::named("x")).unwrap();
        assert!(collection.contains_name("x"));
    }

    #[test]
    fn test_name_reusable_after_close() {
        let collection = forward();
        let first = Item::named("editor");
        collection.open(&first).unwrap();
        first.close().unwrap();
        collection.open(&Item::named("editor")).unwrap();
        assert!(collection.contains_name("editor"));
    }

    #[test]
    fn test_object_cannot_join_two_collections() {
        let a = forward();
        let b = forward();
        let item = Item::named("x");
        a.open(&item).unwrap();
        assert!(matches!(b.open(&item), Err(ShellError::AlreadyMember(_))));
        assert!(matches!(a.open(&item), Err(ShellError::DuplicateName(_))));
        assert!(b.is_empty());
    }

    #[test]
    fn test_unnamed_items_are_not_addressable() {
        let collection = forward();
        let item = Item::build(None, false, HeadlessView::new(ViewKind::Shelf));
        collection.open(&item).unwrap();
        assert_eq!(collection.len(), 1);
        assert!(matches!(collection.get("untitled"), Err(ShellError::NotFound(_))));
    }

    #[test]
    fn test_initialize_failure_releases_membership() {
        let collection = forward();
        let item = Item::build(Some("x"), true, HeadlessView::new(ViewKind::Workspace));
        assert!(collection.open(&item).is_err());
        assert!(collection.is_empty());
        assert!(item.core().claim_membership());
    }

    #[test]
    fn test_view_failure_leaves_collection_empty() {
        let collection = forward();
        let item = Item::build(Some("x"), false, HeadlessView::failing(ViewKind::Workspace));
        let closed = Arc::new(AtomicBool::new(false));
        let closed_clone = closed.clone();
        collection
            .item_closed()
            .connect(move |_| closed_clone.store(true, Ordering::SeqCst));

        assert!(collection.open(&item).is_err());
        assert!(collection.is_empty());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_item_closing_cancel_propagates() {
        let collection = forward();
        let item = Item::named("a");
        collection.open(&item).unwrap();
        collection.item_closing().connect(|args| args.closing.cancel());

        let outcome = item
            .close_with(UserInteraction::Allowed, CloseReason::PROGRAM)
            .unwrap();
        assert_eq!(outcome, CloseOutcome::Cancelled);
        assert!(collection.contains(&item));
    }

    #[test]
    fn test_exclusive_policy_tracks_active_member() {
        let collection: DesktopObjectCollection<Item> = DesktopObjectCollection::new("items", ActivationPolicy::Exclusive);
        let notifications = Arc::new(Mutex::new(Vec::new()));
        {
            let n = notifications.clone();
            collection.item_activation_changed().connect(move |args| {
                n.lock()
                    .push((args.item.title(), args.item.is_active()));
            });
        }

        let a = Item::named("a");
        let b = Item::named("b");
        collection.open(&a).unwrap();
        assert!(Arc::ptr_eq(&collection.active_item().unwrap(), &a));

        collection.open(&b).unwrap();
        assert!(Arc::ptr_eq(&collection.active_item().unwrap(), &b));

        // Deactivations are deferred until a successor activates.
        a.view.simulate_focus(false);
        b.view.simulate_focus(false);
        let before = notifications.lock().len();
        assert!(Arc::ptr_eq(&collection.active_item().unwrap(), &b));

        a.view.simulate_focus(true);
        assert!(Arc::ptr_eq(&collection.active_item().unwrap(), &a));
        assert_eq!(
            notifications.lock()[before..],
            [("b".to_string(), false), ("a".to_string(), true)]
        );

        a.close().unwrap();
        assert!(collection.active_item().is_none());
        assert_eq!(notifications.lock().last(), Some(&("a".to_string(), false)));
    }

    #[test]
    fn test_dispose_disposes_members() {
        let collection = forward();
        let a = Item::named("a");
        let b = Item::named("b");
        collection.open(&a).unwrap();
        collection.open(&b).unwrap();

        collection.dispose();
        assert!(collection.is_empty());
        assert!(a.core().is_disposed() && b.core().is_disposed());
        assert!(a.view.is_disposed());
    }
}
