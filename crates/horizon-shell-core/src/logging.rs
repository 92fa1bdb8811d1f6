//! Logging facilities for Horizon Shell core.
//!
//! Horizon Shell uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in your
//! application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_shell=debug,horizon_shell_core=info")
//!     .init();
//! ```
//!
//! Besides the filter targets, this module holds the helpers used wherever a
//! failure in caller-supplied code must be logged and swallowed instead of
//! propagated (signal listeners, queued invocations, disposal).

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_shell_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_shell_core::signal";
    /// UI-affine dispatcher target.
    pub const DISPATCH: &str = "horizon_shell_core::dispatch";
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Run `f`, logging and swallowing a panic.
///
/// Returns `None` if `f` panicked. `context` names the operation in the log
/// record.
pub fn guard<F, R>(context: &str, f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            tracing::error!(
                target: targets::CORE,
                context,
                panic = %panic_message(payload.as_ref()),
                "swallowed panic"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard("add", || 1 + 1), Some(2));
    }

    #[test]
    fn test_guard_swallows_panic() {
        let result: Option<()> = guard("explode", || panic!("boom"));
        assert!(result.is_none());
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
