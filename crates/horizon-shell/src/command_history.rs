//! Bounded undo/redo history.
//!
//! Each workspace owns one [`CommandHistory`]; components reach it through
//! their host. Commands run with the history unlocked, so a command may
//! itself inspect the history.

use std::fmt;
use std::sync::Arc;

use horizon_shell_core::Signal;
use horizon_shell_core::logging::guard;
use parking_lot::Mutex;

use crate::logging::targets;

/// Default maximum number of commands kept.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// An undoable operation.
pub trait Command: Send + Sync {
    /// Short user-facing name, e.g. "Rotate".
    fn name(&self) -> &str;

    /// Apply (or re-apply) the operation.
    fn execute(&self);

    /// Revert the operation.
    fn unexecute(&self);
}

struct UndoStack {
    commands: Vec<Arc<dyn Command>>,
    index: usize,
    max_size: usize,
}

impl UndoStack {
    fn push(&mut self, command: Arc<dyn Command>) {
        self.commands.truncate(self.index);
        self.commands.push(command);
        if self.commands.len() > self.max_size {
            self.commands.remove(0);
        }
        self.index = self.commands.len();
    }

    fn undo(&mut self) -> Option<Arc<dyn Command>> {
        if self.index > 0 {
            self.index -= 1;
            Some(self.commands[self.index].clone())
        } else {
            None
        }
    }

    fn redo(&mut self) -> Option<Arc<dyn Command>> {
        let command = self.commands.get(self.index).cloned()?;
        self.index += 1;
        Some(command)
    }
}

/// A shared undo/redo history.
///
/// Cloning yields another handle to the same history.
#[derive(Clone)]
pub struct CommandHistory {
    stack: Arc<Mutex<UndoStack>>,
    changed: Arc<Signal<()>>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// Create a history holding at most [`DEFAULT_MAX_SIZE`] commands.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    /// Create a history holding at most `max_size` commands.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            stack: Arc::new(Mutex::new(UndoStack {
                commands: Vec::new(),
                index: 0,
                max_size: max_size.max(1),
            })),
            changed: Arc::new(Signal::new()),
        }
    }

    /// Record a command that has already been executed.
    ///
    /// Any redoable commands are discarded.
    pub fn add_command(&self, command: Arc<dyn Command>) {
        self.stack.lock().push(command);
        self.changed.emit(());
    }

    /// Undo the most recent command. Returns `false` if there was none.
    pub fn undo(&self) -> bool {
        let Some(command) = self.stack.lock().undo() else {
            return false;
        };
        if guard("command unexecute", || command.unexecute()).is_none() {
            tracing::error!(target: targets::COMPONENT, command = command.name(), "undo failed");
        }
        self.changed.emit(());
        true
    }

    /// Redo the next command. Returns `false` if there was none.
    pub fn redo(&self) -> bool {
        let Some(command) = self.stack.lock().redo() else {
            return false;
        };
        if guard("command execute", || command.execute()).is_none() {
            tracing::error!(target: targets::COMPONENT, command = command.name(), "redo failed");
        }
        self.changed.emit(());
        true
    }

    /// Whether there is a command to undo.
    pub fn can_undo(&self) -> bool {
        self.stack.lock().index > 0
    }

    /// Whether there is a command to redo.
    pub fn can_redo(&self) -> bool {
        let stack = self.stack.lock();
        stack.index < stack.commands.len()
    }

    /// Name of the command `undo` would revert.
    pub fn undo_name(&self) -> Option<String> {
        let stack = self.stack.lock();
        stack
            .index
            .checked_sub(1)
            .map(|i| stack.commands[i].name().to_string())
    }

    /// Name of the command `redo` would apply.
    pub fn redo_name(&self) -> Option<String> {
        let stack = self.stack.lock();
        stack.commands.get(stack.index).map(|c| c.name().to_string())
    }

    /// Number of commands held.
    pub fn len(&self) -> usize {
        self.stack.lock().commands.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every command.
    pub fn clear(&self) {
        {
            let mut stack = self.stack.lock();
            stack.commands.clear();
            stack.index = 0;
        }
        self.changed.emit(());
    }

    /// Emitted whenever the history or its position changes.
    pub fn changed(&self) -> &Signal<()> {
        &self.changed
    }
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack.lock();
        f.debug_struct("CommandHistory")
            .field("len", &stack.commands.len())
            .field("index", &stack.index)
            .field("max_size", &stack.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct Add {
        target: Arc<AtomicI32>,
        amount: i32,
    }

    impl Command for Add {
        fn name(&self) -> &str {
            "Add"
        }

        fn execute(&self) {
            self.target.fetch_add(self.amount, Ordering::SeqCst);
        }

        fn unexecute(&self) {
            self.target.fetch_sub(self.amount, Ordering::SeqCst);
        }
    }

    struct Explode;

    impl Command for Explode {
        fn name(&self) -> &str {
            "Explode"
        }

        fn execute(&self) {
            panic!("execute");
        }

        fn unexecute(&self) {
            panic!("unexecute");
        }
    }

    fn run(history: &CommandHistory, target: &Arc<AtomicI32>, amount: i32) {
        let command = Arc::new(Add {
            target: target.clone(),
            amount,
        });
        command.execute();
        history.add_command(command);
    }

    #[test]
    fn test_undo_redo() {
        let history = CommandHistory::new();
        let value = Arc::new(AtomicI32::new(0));
        run(&history, &value, 5);
        run(&history, &value, 3);

        assert!(history.undo());
        assert_eq!(value.load(Ordering::SeqCst), 5);
        assert_eq!(history.redo_name().as_deref(), Some("Add"));
        assert!(history.redo());
        assert_eq!(value.load(Ordering::SeqCst), 8);
        assert!(!history.redo());
    }

    #[test]
    fn test_new_command_discards_redo() {
        let history = CommandHistory::new();
        let value = Arc::new(AtomicI32::new(0));
        run(&history, &value, 1);
        run(&history, &value, 2);
        history.undo();
        run(&history, &value, 10);

        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_bounded() {
        let history = CommandHistory::with_max_size(2);
        let value = Arc::new(AtomicI32::new(0));
        for _ in 0..3 {
            run(&history, &value, 1);
        }
        assert_eq!(history.len(), 2);
        assert!(history.undo());
        assert!(history.undo());
        assert!(!history.undo());
        assert_eq!(value.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_command_is_swallowed() {
        let history = CommandHistory::new();
        history.add_command(Arc::new(Explode));
        assert!(history.undo());
        assert!(history.redo());
        assert!(history.can_undo());
    }
}
