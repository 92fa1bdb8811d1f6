//! A component that records desktop lifecycle activity.
//!
//! [`DesktopMonitor`] watches a window collection and, for every window,
//! its workspaces and shelves. Each state transition, visibility change and
//! activation change becomes a [`MonitorEntry`] in a bounded log. The
//! monitor only listens while started.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use horizon_shell_core::{Signal, SubscriptionSet};
use parking_lot::Mutex;

use crate::component::{ApplicationComponent, ComponentCore};
use crate::collection::DesktopObjectCollection;
use crate::desktop_object::DesktopObject;
use crate::error::Result;
use crate::logging::targets;
use crate::window::{DesktopWindow, DesktopWindowCollection};

/// Entries kept before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 100;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEntry {
    /// Position in the overall event sequence, starting at 1.
    pub index: u64,
    /// The object's name, or empty if unnamed.
    pub name: String,
    /// The object's title when the event happened.
    pub title: String,
    /// What happened.
    pub message: String,
}

#[derive(Default)]
struct EventLog {
    entries: VecDeque<MonitorEntry>,
    next_index: u64,
}

/// Records lifecycle events of windows, workspaces and shelves.
pub struct DesktopMonitor {
    core: ComponentCore,
    this: Weak<DesktopMonitor>,
    windows: DesktopWindowCollection,
    capacity: usize,
    log: Mutex<EventLog>,
    subscriptions: Mutex<SubscriptionSet>,
    // Keyed by window address; released when the window closes.
    window_subscriptions: Mutex<Vec<(usize, SubscriptionSet)>>,
    entry_added: Signal<MonitorEntry>,
}

impl DesktopMonitor {
    /// Create a monitor for `windows` with the default capacity.
    pub fn new(windows: DesktopWindowCollection) -> Arc<Self> {
        Self::with_capacity(windows, DEFAULT_CAPACITY)
    }

    /// Create a monitor keeping at most `capacity` entries.
    pub fn with_capacity(windows: DesktopWindowCollection, capacity: usize) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            core: ComponentCore::new(),
            this: this.clone(),
            windows,
            capacity: capacity.max(1),
            log: Mutex::new(EventLog::default()),
            subscriptions: Mutex::new(SubscriptionSet::new()),
            window_subscriptions: Mutex::new(Vec::new()),
            entry_added: Signal::new(),
        })
    }

    /// The recorded entries, oldest first.
    pub fn entries(&self) -> Vec<MonitorEntry> {
        self.log.lock().entries.iter().cloned().collect()
    }

    /// The messages of the recorded entries, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.log
            .lock()
            .entries
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Drop every entry. Indexing continues.
    pub fn clear(&self) {
        self.log.lock().entries.clear();
    }

    /// Emitted for each new entry.
    pub fn entry_added(&self) -> &Signal<MonitorEntry> {
        &self.entry_added
    }

    fn record<T: DesktopObject>(&self, object: &T, message: String) {
        let entry = {
            let mut log = self.log.lock();
            log.next_index += 1;
            let entry = MonitorEntry {
                index: log.next_index,
                name: object.name().unwrap_or_default().to_string(),
                title: object.title(),
                message,
            };
            if log.entries.len() == self.capacity {
                log.entries.pop_front();
            }
            log.entries.push_back(entry.clone());
            entry
        };
        tracing::trace!(
            target: targets::SHELL,
            index = entry.index,
            object = %entry.name,
            message = %entry.message,
            "monitor entry"
        );
        self.entry_added.emit(entry);
    }

    /// Subscribe to the lifecycle notifications of `collection`, adding the
    /// subscriptions to `set`.
    ///
    /// `active_name` names the collection's active member, for reporting
    /// deactivations.
    fn watch<T, A>(
        &self,
        collection: &DesktopObjectCollection<T>,
        set: &mut SubscriptionSet,
        active_name: A,
    ) where
        T: DesktopObject,
        A: Fn(&Arc<T>) -> Option<String> + Send + Sync + 'static,
    {
        let this = self.this.clone();
        set.push(collection.item_opening().subscribe(move |args| record_state(&this, &args.item)));
        let this = self.this.clone();
        set.push(collection.item_opened().subscribe(move |args| record_state(&this, &args.item)));
        let this = self.this.clone();
        set.push(collection.item_closing().subscribe(move |args| record_state(&this, &args.item)));
        let this = self.this.clone();
        set.push(collection.item_closed().subscribe(move |args| record_state(&this, &args.item)));

        let this = self.this.clone();
        set.push(collection.item_visibility_changed().subscribe(move |args| {
            if let Some(monitor) = this.upgrade() {
                let message = if args.item.is_visible() { "Visible" } else { "Hidden" };
                monitor.record(&*args.item, message.to_string());
            }
        }));

        let this = self.this.clone();
        set.push(collection.item_activation_changed().subscribe(move |args| {
            let Some(monitor) = this.upgrade() else {
                return;
            };
            let message = if args.item.is_active() {
                "Activated".to_string()
            } else {
                let active = active_name(&args.item).unwrap_or_else(|| "none".to_string());
                format!("Deactivated, Active object: {active}")
            };
            monitor.record(&*args.item, message);
        }));
    }

    fn watch_window(&self, window: &Arc<DesktopWindow>) {
        let mut set = SubscriptionSet::new();
        self.watch(window.workspaces(), &mut set, |workspace| {
            workspace
                .desktop_window()
                .and_then(|window| window.active_workspace())
                .map(|active| active.title())
        });
        self.watch(window.shelves(), &mut set, |_| None);
        self.window_subscriptions
            .lock()
            .push((window_key(window), set));
    }

    fn unwatch_window(&self, window: &Arc<DesktopWindow>) {
        let key = window_key(window);
        let released: Vec<SubscriptionSet> = {
            let mut subscriptions = self.window_subscriptions.lock();
            let (released, kept) = std::mem::take(&mut *subscriptions)
                .into_iter()
                .partition(|(k, _)| *k == key);
            *subscriptions = kept;
            released.into_iter().map(|(_, set)| set).collect()
        };
        for mut set in released {
            set.release_all();
        }
    }

    fn subscribe_all(&self) {
        let monitor = self.this.clone();
        let mut set = SubscriptionSet::new();
        self.watch(&self.windows, &mut set, move |_| {
            monitor
                .upgrade()
                .and_then(|monitor| monitor.windows.active_window())
                .map(|active| active.title())
        });

        let this = self.this.clone();
        set.push(self.windows.item_opening().subscribe(move |args| {
            if let Some(monitor) = this.upgrade() {
                monitor.watch_window(&args.item);
            }
        }));
        let this = self.this.clone();
        set.push(self.windows.item_closed().subscribe(move |args| {
            if let Some(monitor) = this.upgrade() {
                monitor.unwatch_window(&args.item);
            }
        }));

        for window in self.windows.items() {
            self.watch_window(&window);
        }
        *self.subscriptions.lock() = set;
    }

    fn unsubscribe_all(&self) {
        self.subscriptions.lock().release_all();
        let windows = std::mem::take(&mut *self.window_subscriptions.lock());
        for (_, mut set) in windows {
            set.release_all();
        }
    }
}

fn record_state<T: DesktopObject>(monitor: &Weak<DesktopMonitor>, item: &Arc<T>) {
    if let Some(monitor) = monitor.upgrade() {
        monitor.record(&**item, format!("State: {:?}", item.state()));
    }
}

fn window_key(window: &Arc<DesktopWindow>) -> usize {
    Arc::as_ptr(window) as usize
}

impl ApplicationComponent for DesktopMonitor {
    fn component_core(&self) -> &ComponentCore {
        &self.core
    }

    fn start(&self) -> Result<()> {
        self.core.start()?;
        self.subscribe_all();
        tracing::debug!(target: targets::SHELL, windows = self.windows.len(), "desktop monitor started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.unsubscribe_all();
        self.core.stop()
    }
}

impl fmt::Debug for DesktopMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopMonitor")
            .field("started", &self.core.is_started())
            .field("entries", &self.log.lock().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop_object::DesktopObjectExt;
    use crate::headless::HeadlessViewFactory;
    use crate::window::DesktopWindowCreationArgs;
    use crate::workspace::WorkspaceCreationArgs;

    #[derive(Default)]
    struct Leaf {
        core: ComponentCore,
    }

    impl ApplicationComponent for Leaf {
        fn component_core(&self) -> &ComponentCore {
            &self.core
        }
    }

    fn windows() -> DesktopWindowCollection {
        DesktopWindowCollection::new(Arc::new(HeadlessViewFactory::new()))
    }

    #[test]
    fn test_records_window_lifecycle() {
        let windows = windows();
        let monitor = DesktopMonitor::new(windows.clone());
        monitor.start().unwrap();

        let window = windows
            .add_new(DesktopWindowCreationArgs::new("Main").name("main"))
            .unwrap();
        assert!(window.close().unwrap());

        let entries = monitor.entries();
        assert_eq!(entries[0].message, "State: Opening");
        assert_eq!(entries[0].name, "main");
        assert_eq!(entries[0].index, 1);
        let messages = monitor.messages();
        for expected in ["State: Open", "Visible", "Activated", "State: Closing", "State: Closed"] {
            assert!(messages.iter().any(|m| m == expected), "missing {expected}: {messages:?}");
        }
        assert_eq!(messages.last().map(String::as_str), Some("State: Closed"));
    }

    #[test]
    fn test_records_workspaces_of_existing_windows() {
        let windows = windows();
        let window = windows.add_new(DesktopWindowCreationArgs::new("Main")).unwrap();

        let monitor = DesktopMonitor::new(windows.clone());
        monitor.start().unwrap();
        window
            .workspaces()
            .add_new(WorkspaceCreationArgs::new(Arc::new(Leaf::default()), "Orders").name("orders"))
            .unwrap();

        assert!(monitor
            .entries()
            .iter()
            .any(|entry| entry.name == "orders" && entry.message == "State: Open"));
    }

    #[test]
    fn test_stop_unsubscribes() {
        let windows = windows();
        let monitor = DesktopMonitor::new(windows.clone());
        monitor.start().unwrap();
        monitor.stop().unwrap();

        windows.add_new(DesktopWindowCreationArgs::new("Main")).unwrap();
        assert!(monitor.entries().is_empty());
    }

    #[test]
    fn test_log_is_bounded() {
        let windows = windows();
        let monitor = DesktopMonitor::with_capacity(windows.clone(), 3);
        monitor.start().unwrap();
        let window = windows.add_new(DesktopWindowCreationArgs::new("Main")).unwrap();
        window.close().unwrap();

        let entries = monitor.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].index > 1);
        assert_eq!(entries[2].message, "State: Closed");
    }
}
