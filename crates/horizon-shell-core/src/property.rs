//! Property system for Horizon Shell.
//!
//! Properties hold the small pieces of mutable state that may be read from
//! any thread (titles, culture and theme names, modified flags) and report
//! whether a write actually changed anything.
//!
//! # Property Types
//!
//! - **Property<T>**: A lock-guarded value with change detection
//! - **ObservableProperty<T>**: A `Property<T>` paired with a change [`Signal`]
//!
//! # Example
//!
//! ```
//! use horizon_shell_core::{ObservableProperty, Property};
//!
//! let modified = Property::new(false);
//! assert!(modified.set(true));
//! assert!(!modified.set(true));
//!
//! let theme = ObservableProperty::new("default".to_string());
//! theme.changed().connect(|name| println!("theme is now {name}"));
//! assert!(theme.set("dark".to_string()));
//! ```

use std::fmt;

use parking_lot::RwLock;

use crate::signal::Signal;

/// A reactive property that tracks changes.
///
/// `Property<T>` wraps a value and provides change detection. When `set()` is
/// called, it compares the new value with the current one and returns whether
/// the value actually changed.
///
/// # Thread Safety
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// when `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()` instead.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

/// A property that emits its new value whenever a write changes it.
///
/// The lock is released before the signal fires, so listeners may read the
/// property back.
pub struct ObservableProperty<T> {
    value: Property<T>,
    changed: Signal<T>,
}

impl<T: Clone + PartialEq + 'static> ObservableProperty<T> {
    /// Create a new observable property.
    pub fn new(value: T) -> Self {
        Self {
            value: Property::new(value),
            changed: Signal::new(),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.value.with(f)
    }

    /// Set the value, emitting [`changed`](Self::changed) if it differs.
    pub fn set(&self, value: T) -> bool {
        if self.value.set(value.clone()) {
            self.changed.emit(value);
            true
        } else {
            false
        }
    }

    /// The change notification.
    pub fn changed(&self) -> &Signal<T> {
        &self.changed
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for ObservableProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for ObservableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableProperty")
            .field("value", &self.value.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_property_basic() {
        let prop = Property::new(42);
        assert_eq!(prop.get(), 42);
    }

    #[test]
    fn test_property_set_detects_change() {
        let prop = Property::new(10);
        assert!(!prop.set(10));
        assert!(prop.set(20));
        assert_eq!(prop.get(), 20);
    }

    #[test]
    fn test_property_thread_safe() {
        let prop = Arc::new(Property::new(0));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let prop = prop.clone();
                std::thread::spawn(move || {
                    prop.set(i);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!((0..4).contains(&prop.get()));
    }

    #[test]
    fn test_observable_property_emits_only_on_change() {
        let prop = ObservableProperty::new("en-US".to_string());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        prop.changed().connect(move |value| seen_clone.lock().push(value.clone()));

        assert!(!prop.set("en-US".to_string()));
        assert!(prop.set("fr-FR".to_string()));
        assert_eq!(*seen.lock(), vec!["fr-FR".to_string()]);
        assert_eq!(prop.get(), "fr-FR");
    }

    #[test]
    fn test_observable_listener_can_read_back() {
        let prop = Arc::new(ObservableProperty::new(1));
        let observed = Arc::new(Mutex::new(None));
        {
            let prop_ref = Arc::downgrade(&prop);
            let observed = observed.clone();
            prop.changed().connect(move |_| {
                if let Some(prop) = prop_ref.upgrade() {
                    *observed.lock() = Some(prop.get());
                }
            });
        }
        prop.set(5);
        assert_eq!(*observed.lock(), Some(5));
    }
}
