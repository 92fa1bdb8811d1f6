//! Logging and debugging facilities for the desktop shell.
//!
//! This module provides:
//! - Target names for filtering the shell's `tracing` output
//! - Debug visualization of the desktop tree (windows and their workspaces,
//!   shelves and dialog boxes)
//!
//! # Tracing Integration
//!
//! The shell never installs a subscriber. To see logs:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_shell=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```ignore
//! use horizon_shell::logging::DesktopTreeDebug;
//!
//! let debug = DesktopTreeDebug::new();
//! println!("{}", debug.format(application.windows()));
//! ```

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use crate::desktop_object::{DesktopObject, DesktopObjectCore};
use crate::view::DesktopObjectView;
use crate::window::{DesktopWindow, DesktopWindowCollection};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Shell crate target.
    pub const SHELL: &str = "horizon_shell";
    /// Desktop object lifecycle target.
    pub const OBJECT: &str = "horizon_shell::object";
    /// Collection membership target.
    pub const COLLECTION: &str = "horizon_shell::collection";
    /// Component hosting target.
    pub const COMPONENT: &str = "horizon_shell::component";
    /// Application coordinator target.
    pub const APPLICATION: &str = "horizon_shell::application";
    /// Session manager target.
    pub const SESSION: &str = "horizon_shell::session";
}

/// Style options for desktop tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact dash-prefixed lines.
    Compact,
}

/// Configuration for desktop tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show lifecycle states.
    pub show_state: bool,
    /// Whether to show active/visible markers.
    pub show_flags: bool,
    /// Whether to list dialog boxes under their window.
    pub show_dialogs: bool,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_state: true,
            show_flags: true,
            show_dialogs: true,
        }
    }
}

impl TreeFormatOptions {
    /// Options for minimal output: names and titles only.
    pub fn minimal() -> Self {
        Self {
            show_state: false,
            show_flags: false,
            ..Default::default()
        }
    }
}

/// Renders the desktop tree in a human-readable form.
#[derive(Debug, Clone, Default)]
pub struct DesktopTreeDebug {
    options: TreeFormatOptions,
}

impl DesktopTreeDebug {
    /// Create a visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every window in `windows`.
    pub fn format(&self, windows: &DesktopWindowCollection) -> String {
        let items = windows.items();
        let mut output = String::new();
        let _ = writeln!(output, "Desktop ({} windows):", items.len());
        if items.is_empty() {
            output.push_str("  (empty)\n");
        }
        let count = items.len();
        for (i, window) in items.iter().enumerate() {
            self.format_window_into(window, i + 1 == count, &mut output);
        }
        output
    }

    /// Format one window and its children.
    pub fn format_window(&self, window: &Arc<DesktopWindow>) -> String {
        let mut output = String::new();
        self.format_window_into(window, true, &mut output);
        output
    }

    fn format_window_into(&self, window: &Arc<DesktopWindow>, is_last: bool, output: &mut String) {
        self.write_node(window.core(), &[], is_last, output);

        let mut children: Vec<String> = Vec::new();
        for workspace in window.workspaces().items() {
            children.push(self.label(workspace.core()));
        }
        for shelf in window.shelves().items() {
            children.push(self.label(shelf.core()));
        }
        if self.options.show_dialogs {
            for dialog in window.dialog_boxes().items() {
                children.push(self.label(dialog.core()));
            }
        }

        let count = children.len();
        for (i, label) in children.into_iter().enumerate() {
            output.push_str(&self.build_prefix(&[is_last], i + 1 == count));
            output.push_str(&label);
            output.push('\n');
        }
    }

    fn write_node<V: DesktopObjectView + ?Sized>(
        &self,
        core: &DesktopObjectCore<V>,
        ancestors_last: &[bool],
        is_last: bool,
        output: &mut String,
    ) {
        output.push_str(&self.build_prefix(ancestors_last, is_last));
        output.push_str(&self.label(core));
        output.push('\n');
    }

    fn label<V: DesktopObjectView + ?Sized>(&self, core: &DesktopObjectCore<V>) -> String {
        let mut label = core.kind().to_string();
        if let Some(name) = core.name() {
            let _ = write!(label, " '{name}'");
        }
        let _ = write!(label, " \"{}\"", core.title());

        let mut markers = Vec::new();
        if self.options.show_state {
            markers.push(format!("{:?}", core.state()));
        }
        if self.options.show_flags {
            if core.is_active() {
                markers.push("active".to_string());
            }
            if core.is_visible() {
                markers.push("visible".to_string());
            }
        }
        if !markers.is_empty() {
            let _ = write!(label, " [{}]", markers.join(", "));
        }
        label
    }

    /// Build the prefix for a node whose ancestors' last-child flags are
    /// `ancestors_last`. Top-level nodes sit one level below the header.
    fn build_prefix(&self, ancestors_last: &[bool], is_last: bool) -> String {
        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|   ", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}   ", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("  ", "- ", "- "),
        };

        let mut prefix = String::new();
        for &ancestor_last in ancestors_last {
            if ancestor_last {
                prefix.push_str(&" ".repeat(branch.chars().count()));
            } else {
                prefix.push_str(branch);
            }
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_per_style() {
        let ascii = DesktopTreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..Default::default()
        });
        assert_eq!(ascii.build_prefix(&[], false), "+-- ");
        assert_eq!(ascii.build_prefix(&[false], true), "|   `-- ");
        assert_eq!(ascii.build_prefix(&[true], false), "    +-- ");

        let unicode = DesktopTreeDebug::new();
        assert_eq!(unicode.build_prefix(&[], true), "\u{2514}\u{2500}\u{2500} ");

        let compact = DesktopTreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Compact,
            ..TreeFormatOptions::minimal()
        });
        assert_eq!(compact.build_prefix(&[false], false), "  - ");
    }
}
