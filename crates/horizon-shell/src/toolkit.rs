//! GUI toolkit integration.
//!
//! A [`GuiToolkit`] owns the UI event loop. [`run`](GuiToolkit::run) blocks
//! the calling thread, which becomes the UI-affine thread: the toolkit binds
//! a [`UiDispatcher`] to it, hands the dispatcher to the `started` callback
//! from inside the loop, and keeps executing dispatched work until
//! [`terminate`](GuiToolkit::terminate) is called.
//!
//! [`HeadlessToolkit`] runs the dispatcher loop alone. With the `winit`
//! feature, [`WinitToolkit`] runs a winit event loop and wakes it for
//! dispatched work.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use horizon_shell_core::UiDispatcher;
use parking_lot::Mutex;

use crate::error::{Result, ShellError};
use crate::logging::targets;

/// Callback invoked on the UI thread once the event loop is running.
pub type StartedCallback = Box<dyn FnOnce(UiDispatcher) + Send>;

/// A UI toolkit that can run an event loop.
pub trait GuiToolkit: Send + Sync {
    /// Identifier of the toolkit, for logging.
    fn toolkit_id(&self) -> &str;

    /// Run the event loop on the calling thread until terminated.
    fn run(&self, started: StartedCallback) -> Result<()>;

    /// Stop the event loop. Called on the UI thread.
    fn terminate(&self) -> Result<()>;

    /// Release resources after the loop has finished.
    fn dispose(&self) {}
}

/// A toolkit without a display: the event loop is the dispatcher's loop.
#[derive(Default)]
pub struct HeadlessToolkit {
    dispatcher: Mutex<Option<UiDispatcher>>,
    fail_terminate: AtomicBool,
    terminations: AtomicUsize,
}

impl HeadlessToolkit {
    /// Create a headless toolkit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a toolkit whose `terminate` stops the loop and then reports
    /// failure, as a toolkit that did not shut down cleanly would.
    pub fn failing_terminate() -> Self {
        let toolkit = Self::default();
        toolkit.fail_terminate.store(true, Ordering::SeqCst);
        toolkit
    }

    /// How many times `terminate` has been called.
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.dispatcher.lock().is_some()
    }
}

impl GuiToolkit for HeadlessToolkit {
    fn toolkit_id(&self) -> &str {
        "headless"
    }

    fn run(&self, started: StartedCallback) -> Result<()> {
        let dispatcher = UiDispatcher::new();
        let _scope = dispatcher.install();
        {
            let mut slot = self.dispatcher.lock();
            if slot.is_some() {
                return Err(ShellError::toolkit("headless toolkit is already running"));
            }
            *slot = Some(dispatcher.clone());
        }

        let handle = dispatcher.clone();
        dispatcher.post(move || started(handle))?;

        tracing::debug!(target: targets::APPLICATION, toolkit = "headless", "event loop running");
        dispatcher.run();
        tracing::debug!(target: targets::APPLICATION, toolkit = "headless", "event loop finished");

        *self.dispatcher.lock() = None;
        Ok(())
    }

    fn terminate(&self) -> Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        let dispatcher = self
            .dispatcher
            .lock()
            .clone()
            .ok_or_else(|| ShellError::toolkit("headless toolkit is not running"))?;
        dispatcher.close();

        if self.fail_terminate.load(Ordering::SeqCst) {
            return Err(ShellError::toolkit("headless toolkit failed to terminate"));
        }
        Ok(())
    }
}

#[cfg(feature = "winit")]
pub use self::winit_toolkit::WinitToolkit;

#[cfg(feature = "winit")]
mod winit_toolkit {
    use horizon_shell_core::UiDispatcher;
    use parking_lot::Mutex;
    use winit::application::ApplicationHandler;
    use winit::event::WindowEvent;
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
    use winit::window::WindowId;

    use super::{GuiToolkit, StartedCallback};
    use crate::error::{Result, ShellError};
    use crate::logging::targets;

    #[derive(Debug, Clone, Copy)]
    enum ToolkitEvent {
        /// Work was dispatched to the UI thread.
        Wake,
        /// Leave the event loop.
        Exit,
    }

    /// A toolkit driving a winit event loop.
    ///
    /// Dispatched invocations wake the loop through a user event and are
    /// executed between native events. Views are expected to create their
    /// own winit windows; this toolkit only owns the loop.
    ///
    /// Some platforms require [`run`](GuiToolkit::run) to be called on the
    /// main thread.
    #[derive(Default)]
    pub struct WinitToolkit {
        proxy: Mutex<Option<EventLoopProxy<ToolkitEvent>>>,
    }

    impl WinitToolkit {
        /// Create a winit toolkit.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl GuiToolkit for WinitToolkit {
        fn toolkit_id(&self) -> &str {
            "winit"
        }

        fn run(&self, started: StartedCallback) -> Result<()> {
            let event_loop: EventLoop<ToolkitEvent> = EventLoop::with_user_event()
                .build()
                .map_err(|e| ShellError::toolkit(e.to_string()))?;
            event_loop.set_control_flow(ControlFlow::Wait);

            let dispatcher = UiDispatcher::new();
            let _scope = dispatcher.install();

            let proxy = event_loop.create_proxy();
            let waker_proxy = Mutex::new(proxy.clone());
            dispatcher.set_waker(move || {
                let _ = waker_proxy.lock().send_event(ToolkitEvent::Wake);
            });
            *self.proxy.lock() = Some(proxy);

            let mut handler = ToolkitHandler {
                dispatcher: dispatcher.clone(),
                started: Some(started),
            };
            let result = event_loop
                .run_app(&mut handler)
                .map_err(|e| ShellError::toolkit(e.to_string()));

            *self.proxy.lock() = None;
            dispatcher.close();
            result
        }

        fn terminate(&self) -> Result<()> {
            let proxy = self.proxy.lock();
            let proxy = proxy
                .as_ref()
                .ok_or_else(|| ShellError::toolkit("winit event loop is not running"))?;
            proxy
                .send_event(ToolkitEvent::Exit)
                .map_err(|_| ShellError::toolkit("winit event loop already exited"))
        }
    }

    struct ToolkitHandler {
        dispatcher: UiDispatcher,
        started: Option<StartedCallback>,
    }

    impl ToolkitHandler {
        fn drain(&self, event_loop: &ActiveEventLoop) {
            self.dispatcher.process_pending();
            if self.dispatcher.is_closed() {
                event_loop.exit();
            }
        }
    }

    impl ApplicationHandler<ToolkitEvent> for ToolkitHandler {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if let Some(started) = self.started.take() {
                tracing::debug!(target: targets::APPLICATION, toolkit = "winit", "event loop running");
                started(self.dispatcher.clone());
            }
            self.drain(event_loop);
        }

        fn window_event(
            &mut self,
            _event_loop: &ActiveEventLoop,
            _window_id: WindowId,
            _event: WindowEvent,
        ) {
            // Views route their own window events.
        }

        fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ToolkitEvent) {
            tracing::trace!(target: targets::APPLICATION, ?event, "toolkit user event");
            match event {
                ToolkitEvent::Wake => self.drain(event_loop),
                ToolkitEvent::Exit => {
                    self.dispatcher.close();
                    event_loop.exit();
                }
            }
        }

        fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
            self.drain(event_loop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_headless_run_calls_started_on_loop_thread() {
        let toolkit = Arc::new(HeadlessToolkit::new());
        let seen = Arc::new(Mutex::new(None));

        let inner = toolkit.clone();
        let record = seen.clone();
        toolkit
            .run(Box::new(move |dispatcher| {
                *record.lock() = Some(dispatcher.is_ui_thread());
                assert!(inner.is_running());
                inner.terminate().unwrap();
            }))
            .unwrap();

        assert_eq!(*seen.lock(), Some(true));
        assert!(!toolkit.is_running());
        assert_eq!(toolkit.terminations(), 1);
    }

    #[test]
    fn test_terminate_when_not_running_fails() {
        let toolkit = HeadlessToolkit::new();
        assert!(matches!(toolkit.terminate(), Err(ShellError::Toolkit(_))));
    }

    #[test]
    fn test_failing_terminate_still_stops_loop() {
        let toolkit = Arc::new(HeadlessToolkit::failing_terminate());
        let inner = toolkit.clone();
        toolkit
            .run(Box::new(move |_| {
                assert!(inner.terminate().is_err());
            }))
            .unwrap();
        assert!(!toolkit.is_running());
    }
}
