//! The application coordinator.
//!
//! [`Application`] owns the window collection, the session manager and the
//! GUI toolkit. [`run`](Application::run) blocks in the toolkit's event
//! loop; the loop thread becomes the UI thread and every kernel object must
//! be touched only from it. Other threads reach the UI thread through
//! [`marshal_delegate`](Application::marshal_delegate) or by calling
//! [`quit`](Application::quit), which forwards itself and blocks.
//!
//! # Startup
//!
//! Once the event loop runs, the application creates its view, initiates
//! the session, opens the root window and calls the initializer supplied to
//! the builder. Any failure terminates the toolkit and `run` returns the
//! error after the loop exits.
//!
//! # Quitting
//!
//! A normal quit closes every window (first without interaction, then with)
//! and aborts if any window refuses. It then emits the cancellable
//! [`quitting`](Application::quitting) notification, terminates the session
//! and terminates the toolkit. A forced quit skips straight to session and
//! toolkit termination. A toolkit that fails to terminate is unrecoverable:
//! the process exits with code -1.
//!
//! ```no_run
//! use horizon_shell::{Application, ShellConfig};
//!
//! let app = Application::builder()
//!     .config(ShellConfig::new().application_name("Viewer"))
//!     .build();
//!
//! app.run().unwrap();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use horizon_shell_core::logging::guard;
use horizon_shell_core::{ObservableProperty, Signal, SubscriptionSet, UiDispatcher};
use parking_lot::Mutex;

use crate::config::ShellConfig;
use crate::desktop_object::{CloseReason, DesktopObject, DesktopObjectExt, DesktopObjectState, UserInteraction};
use crate::error::{Result, ShellError};
use crate::headless::HeadlessViewFactory;
use crate::logging::targets;
use crate::session::{LocalSessionManager, SessionManager};
use crate::toolkit::{GuiToolkit, HeadlessToolkit};
use crate::view::{ApplicationView, DialogBoxAction, MessageBoxActions, ViewFactory};
use crate::window::{DesktopWindow, DesktopWindowCollection, DesktopWindowCreationArgs};

/// The process-wide application handle set by [`Application::install`].
static INSTANCE: OnceLock<Arc<Application>> = OnceLock::new();

/// Where the application is in its quit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuitState {
    /// Running normally.
    #[default]
    NotQuitting,
    /// A normal quit is in progress.
    QuittingNormally,
    /// A forced quit is in progress.
    QuittingForcefully,
}

impl QuitState {
    /// Whether any quit is in progress.
    pub fn is_quitting(self) -> bool {
        self != QuitState::NotQuitting
    }
}

/// Arguments of the cancellable [`quitting`](Application::quitting)
/// notification.
#[derive(Debug, Default)]
pub struct QuittingEventArgs {
    cancel: AtomicBool,
}

impl QuittingEventArgs {
    /// Ask the application to keep running.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether a listener cancelled the quit.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Hook run on the UI thread after the root window has opened.
pub type Initializer = Box<dyn FnOnce(&Arc<Application>) -> Result<()> + Send>;

/// Process exit used when the toolkit cannot be terminated.
pub type FatalExit = Arc<dyn Fn(i32) + Send + Sync>;

fn exit_process(code: i32) {
    std::process::exit(code)
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    config: ShellConfig,
    toolkit: Option<Arc<dyn GuiToolkit>>,
    view_factory: Option<Arc<dyn ViewFactory>>,
    session: Option<Arc<dyn SessionManager>>,
    fatal_exit: Option<FatalExit>,
    initializer: Option<Initializer>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config: ShellConfig::default(),
            toolkit: None,
            view_factory: None,
            session: None,
            fatal_exit: None,
            initializer: None,
        }
    }

    /// Use `config`.
    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    /// Run on `toolkit`. Defaults to [`HeadlessToolkit`].
    pub fn toolkit(mut self, toolkit: Arc<dyn GuiToolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    /// Create views with `factory`. Defaults to [`HeadlessViewFactory`].
    pub fn view_factory(mut self, factory: Arc<dyn ViewFactory>) -> Self {
        self.view_factory = Some(factory);
        self
    }

    /// Manage the session with `session`. Defaults to
    /// [`LocalSessionManager`].
    pub fn session_manager(mut self, session: Arc<dyn SessionManager>) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the forced process exit, for embedding and tests.
    pub fn fatal_exit<F>(mut self, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.fatal_exit = Some(Arc::new(exit));
        self
    }

    /// Run `initializer` once the root window is open. An error aborts
    /// startup.
    pub fn initializer<F>(mut self, initializer: F) -> Self
    where
        F: FnOnce(&Arc<Application>) -> Result<()> + Send + 'static,
    {
        self.initializer = Some(Box::new(initializer));
        self
    }

    /// Build the application.
    pub fn build(self) -> Arc<Application> {
        let view_factory = self
            .view_factory
            .unwrap_or_else(|| Arc::new(HeadlessViewFactory::new()));
        let app = Arc::new_cyclic(|this: &Weak<Application>| Application {
            this: this.clone(),
            ui_culture: ObservableProperty::new(self.config.ui_culture.clone()),
            ui_theme: ObservableProperty::new(self.config.ui_theme.clone()),
            config: self.config,
            toolkit: self.toolkit.unwrap_or_else(|| Arc::new(HeadlessToolkit::new())),
            windows: DesktopWindowCollection::new(view_factory.clone()),
            view_factory,
            session: self
                .session
                .unwrap_or_else(|| Arc::new(LocalSessionManager::new())),
            fatal_exit: self
                .fatal_exit
                .unwrap_or_else(|| Arc::new(exit_process)),
            initializer: Mutex::new(self.initializer),
            dispatcher: Mutex::new(None),
            view: Mutex::new(None),
            quit_state: Mutex::new(QuitState::NotQuitting),
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            toolkit_live: AtomicBool::new(false),
            startup_error: Mutex::new(None),
            subscriptions: Mutex::new(SubscriptionSet::new()),
            started: Signal::new(),
            quitting: Signal::new(),
        });
        app.watch_last_window();
        app
    }
}

/// The application coordinator.
pub struct Application {
    this: Weak<Application>,
    config: ShellConfig,
    toolkit: Arc<dyn GuiToolkit>,
    view_factory: Arc<dyn ViewFactory>,
    session: Arc<dyn SessionManager>,
    fatal_exit: FatalExit,
    initializer: Mutex<Option<Initializer>>,

    windows: DesktopWindowCollection,
    dispatcher: Mutex<Option<UiDispatcher>>,
    view: Mutex<Option<Arc<dyn ApplicationView>>>,

    quit_state: Mutex<QuitState>,
    initialized: AtomicBool,
    running: AtomicBool,
    toolkit_live: AtomicBool,
    startup_error: Mutex<Option<ShellError>>,
    subscriptions: Mutex<SubscriptionSet>,

    // Readable from any thread.
    ui_culture: ObservableProperty<String>,
    ui_theme: ObservableProperty<String>,

    started: Signal<()>,
    quitting: Signal<QuittingEventArgs>,
}

static_assertions::assert_impl_all!(Application: Send, Sync);

impl Application {
    /// Start building an application.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Make `app` the process-wide instance. Fails if one is installed.
    pub fn install(app: Arc<Application>) -> Result<()> {
        INSTANCE.set(app).map_err(|_| ShellError::AlreadyInstalled)
    }

    /// The process-wide instance, if installed.
    pub fn instance() -> Option<Arc<Application>> {
        INSTANCE.get().cloned()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// The application name.
    pub fn name(&self) -> &str {
        &self.config.application_name
    }

    /// The application version.
    pub fn version(&self) -> &str {
        &self.config.application_version
    }

    /// The desktop windows.
    pub fn windows(&self) -> &DesktopWindowCollection {
        &self.windows
    }

    /// The active desktop window.
    pub fn active_window(&self) -> Option<Arc<DesktopWindow>> {
        self.windows.active_window()
    }

    /// The root window, while it is open.
    pub fn root_window(&self) -> Option<Arc<DesktopWindow>> {
        self.windows.get(&self.config.root_window_name).ok()
    }

    /// The view factory shared by all windows.
    pub fn view_factory(&self) -> &Arc<dyn ViewFactory> {
        &self.view_factory
    }

    /// The session manager.
    pub fn session_manager(&self) -> &Arc<dyn SessionManager> {
        &self.session
    }

    /// The UI thread's dispatcher, between startup and teardown.
    pub fn dispatcher(&self) -> Option<UiDispatcher> {
        self.dispatcher.lock().clone()
    }

    /// Whether startup completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// The quit state.
    pub fn quit_state(&self) -> QuitState {
        *self.quit_state.lock()
    }

    /// The UI culture.
    pub fn ui_culture(&self) -> String {
        self.ui_culture.get()
    }

    /// Set the UI culture. Returns whether it changed.
    pub fn set_ui_culture(&self, culture: impl Into<String>) -> bool {
        self.ui_culture.set(culture.into())
    }

    /// The UI theme.
    pub fn ui_theme(&self) -> String {
        self.ui_theme.get()
    }

    /// Set the UI theme. Returns whether it changed.
    pub fn set_ui_theme(&self, theme: impl Into<String>) -> bool {
        self.ui_theme.set(theme.into())
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Emitted on the UI thread once startup completes.
    pub fn started(&self) -> &Signal<()> {
        &self.started
    }

    /// Emitted during a normal quit, after every window closed. Cancelling
    /// keeps the application running.
    pub fn quitting(&self) -> &Signal<QuittingEventArgs> {
        &self.quitting
    }

    /// Emitted when the UI culture changes.
    pub fn ui_culture_changed(&self) -> &Signal<String> {
        self.ui_culture.changed()
    }

    /// Emitted when the UI theme changes.
    pub fn ui_theme_changed(&self) -> &Signal<String> {
        self.ui_theme.changed()
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Run the application on the calling thread until it quits.
    ///
    /// Returns the startup error if startup failed, or the toolkit's error
    /// if its loop could not run. The application is cleaned up before
    /// returning, however the loop ended.
    #[tracing::instrument(skip_all, target = "horizon_shell::application")]
    pub fn run(self: &Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ShellError::toolkit("application is already running"));
        }
        tracing::info!(
            target: targets::APPLICATION,
            toolkit = self.toolkit.toolkit_id(),
            version = %self.config.application_version,
            app = %self.config.application_name,
            "starting application"
        );

        let this = self.this.clone();
        self.toolkit_live.store(true, Ordering::SeqCst);
        let loop_result = self.toolkit.run(Box::new(move |dispatcher| {
            if let Some(app) = this.upgrade() {
                app.on_toolkit_started(dispatcher);
            }
        }));
        self.toolkit_live.store(false, Ordering::SeqCst);
        *self.dispatcher.lock() = None;
        self.clean_up();

        if let Err(err) = loop_result {
            tracing::error!(target: targets::APPLICATION, error = %err, "event loop failed");
            return Err(err);
        }
        tracing::info!(target: targets::APPLICATION, quit_state = ?self.quit_state(), "application finished");

        match self.startup_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn on_toolkit_started(self: &Arc<Self>, dispatcher: UiDispatcher) {
        *self.dispatcher.lock() = Some(dispatcher);

        match self.initialize() {
            Ok(()) => {
                self.initialized.store(true, Ordering::SeqCst);
                tracing::info!(target: targets::APPLICATION, "application initialized");
                self.started.emit(());
            }
            Err(err) => {
                tracing::error!(
                    target: targets::APPLICATION,
                    fatal = true,
                    error = %err,
                    "application failed to start"
                );
                *self.startup_error.lock() = Some(err);
                self.terminate_gui_toolkit();
            }
        }
    }

    fn initialize(self: &Arc<Self>) -> Result<()> {
        let view = self.view_factory.create_application_view()?;
        *self.view.lock() = Some(view);

        self.initiate_session()?;

        self.windows.add_new(
            DesktopWindowCreationArgs::new(self.config.effective_root_title())
                .name(self.config.root_window_name.clone()),
        )?;

        let initializer = self.initializer.lock().take();
        if let Some(initializer) = initializer {
            initializer(self)?;
        }
        Ok(())
    }

    fn initiate_session(&self) -> Result<()> {
        match guard("session initiate", || self.session.initiate_session()) {
            Some(Ok(true)) => Ok(()),
            Some(Ok(false)) => Err(ShellError::session("session was not initiated")),
            Some(Err(err)) => {
                tracing::error!(target: targets::SESSION, fatal = true, error = %err, "session initiation failed");
                Err(err)
            }
            None => Err(ShellError::session("session manager panicked during initiation")),
        }
    }

    /// Quit when the last window closes, unless already quitting.
    fn watch_last_window(&self) {
        let this = self.this.clone();
        let subscription = self.windows.item_closed().subscribe(move |_| {
            let Some(app) = this.upgrade() else {
                return;
            };
            if !app.config.quit_when_last_window_closes
                || !app.windows.is_empty()
                || app.quit_state().is_quitting()
            {
                return;
            }
            tracing::debug!(target: targets::APPLICATION, "last window closed");
            if let Err(err) = app.quit(false) {
                tracing::debug!(target: targets::APPLICATION, error = %err, "quit after last window skipped");
            }
        });
        self.subscriptions.lock().push(subscription);
    }

    // =========================================================================
    // Quitting
    // =========================================================================

    /// Quit the application.
    ///
    /// Runs on the UI thread; from any other thread the call is forwarded
    /// and blocks until the quit decision is made. Returns `Ok(true)` if
    /// the application is terminating and `Ok(false)` if a window or a
    /// `quitting` listener refused, a quit is already under way, or the UI
    /// thread is gone.
    ///
    /// A normal quit before startup completes fails with
    /// [`ShellError::NotInitialized`].
    #[tracing::instrument(skip(self), target = "horizon_shell::application", level = "debug")]
    pub fn quit(&self, force: bool) -> Result<bool> {
        if !force && !self.is_initialized() {
            return Err(ShellError::NotInitialized);
        }
        let Some(dispatcher) = self.dispatcher() else {
            tracing::debug!(target: targets::APPLICATION, "quit ignored; no UI thread");
            return Ok(false);
        };

        if dispatcher.is_ui_thread() {
            return Ok(self.do_quit(force));
        }

        let this = self.this.clone();
        match dispatcher.send(move || this.upgrade().is_some_and(|app| app.do_quit(force))) {
            Ok(quitting) => Ok(quitting),
            Err(err) => {
                // The UI thread shut down before running the quit.
                tracing::debug!(target: targets::APPLICATION, error = %err, "quit not delivered");
                Ok(false)
            }
        }
    }

    /// Quit without negotiating with windows.
    pub fn shutdown(&self) -> Result<bool> {
        self.quit(true)
    }

    fn do_quit(&self, force: bool) -> bool {
        {
            let mut state = self.quit_state.lock();
            if state.is_quitting() {
                tracing::debug!(target: targets::APPLICATION, state = ?*state, "quit already in progress");
                return false;
            }
            *state = if force {
                QuitState::QuittingForcefully
            } else {
                QuitState::QuittingNormally
            };
        }
        tracing::info!(target: targets::APPLICATION, force, "quitting");

        if !force {
            if !self.close_all_windows() {
                tracing::info!(target: targets::APPLICATION, "quit aborted; a window refused to close");
                *self.quit_state.lock() = QuitState::NotQuitting;
                return false;
            }

            let args = QuittingEventArgs::default();
            self.quitting.emit_ref(&args);
            if args.is_cancelled() {
                tracing::info!(target: targets::APPLICATION, "quit cancelled by listener");
                *self.quit_state.lock() = QuitState::NotQuitting;
                return false;
            }
        }

        self.terminate_session();
        self.terminate_gui_toolkit();
        true
    }

    /// Close every open window with [`CloseReason::APPLICATION_QUIT`].
    ///
    /// Windows that can close without asking are closed first; the rest
    /// are then closed interactively. Stops at the first refusal.
    fn close_all_windows(&self) -> bool {
        for window in self.windows.items() {
            if window.state() == DesktopObjectState::Open {
                if let Err(err) =
                    window.close_with(UserInteraction::NotAllowed, CloseReason::APPLICATION_QUIT)
                {
                    tracing::warn!(
                        target: targets::APPLICATION,
                        window = %window.core().describe(),
                        error = %err,
                        "window failed to close without interaction"
                    );
                }
            }
        }

        for window in self.windows.items() {
            if window.state() != DesktopObjectState::Open {
                continue;
            }
            match window.close_with(UserInteraction::Allowed, CloseReason::APPLICATION_QUIT) {
                Ok(outcome) if outcome.is_closed() => {}
                Ok(outcome) => {
                    tracing::debug!(
                        target: targets::APPLICATION,
                        window = %window.core().describe(),
                        ?outcome,
                        "window refused to close"
                    );
                    return false;
                }
                Err(err) => {
                    tracing::error!(
                        target: targets::APPLICATION,
                        window = %window.core().describe(),
                        error = %err,
                        "window failed to close"
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Close every window, returning whether all of them closed.
    ///
    /// Does not quit by itself; closing the last window quits only when
    /// configured to.
    pub fn close_all(&self) -> bool {
        self.close_all_windows()
    }

    fn terminate_session(&self) {
        match guard("session terminate", || self.session.terminate_session()) {
            Some(Ok(())) => tracing::debug!(target: targets::SESSION, "session terminated"),
            Some(Err(err)) => {
                tracing::error!(target: targets::SESSION, error = %err, "session termination failed")
            }
            None => tracing::error!(target: targets::SESSION, "session manager panicked during termination"),
        }
    }

    /// Stop the toolkit's event loop. A toolkit that fails to stop ends the
    /// process.
    fn terminate_gui_toolkit(&self) {
        // Nothing is marshaled once teardown starts.
        *self.dispatcher.lock() = None;
        if !self.toolkit_live.swap(false, Ordering::SeqCst) {
            return;
        }
        match guard("toolkit terminate", || self.toolkit.terminate()) {
            Some(Ok(())) => {
                tracing::debug!(target: targets::APPLICATION, toolkit = self.toolkit.toolkit_id(), "toolkit terminated")
            }
            Some(Err(err)) => {
                tracing::error!(target: targets::APPLICATION, error = %err, "toolkit failed to terminate; exiting");
                (self.fatal_exit)(-1);
            }
            None => {
                tracing::error!(target: targets::APPLICATION, "toolkit panicked while terminating; exiting");
                (self.fatal_exit)(-1);
            }
        }
    }

    /// Release the view, the windows and the toolkit once the loop has
    /// ended. Windows still open after a forced quit or a failed startup
    /// are disposed without closing.
    fn clean_up(&self) {
        tracing::debug!(target: targets::APPLICATION, "cleaning up");
        *self.dispatcher.lock() = None;
        if let Some(view) = self.view.lock().take() {
            guard("application view dispose", || view.dispose());
        }
        self.subscriptions.lock().release_all();
        self.windows.dispose();
        guard("toolkit dispose", || self.toolkit.dispose());
    }

    // =========================================================================
    // Cross-thread and session helpers
    // =========================================================================

    /// Run `f` on the UI thread: inline when called there, posted
    /// otherwise.
    ///
    /// Returns `false` when there is no UI thread (before startup or after
    /// teardown); `f` is then dropped without running.
    pub fn marshal_delegate<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.dispatcher() {
            Some(dispatcher) => dispatcher.marshal(f),
            None => false,
        }
    }

    /// Invalidate the session. Failures are logged.
    pub fn invalidate_session(&self) {
        match guard("session invalidate", || self.session.invalidate_session()) {
            Some(Ok(())) => tracing::debug!(target: targets::SESSION, "session invalidated"),
            Some(Err(err)) => {
                tracing::error!(target: targets::SESSION, error = %err, "session invalidation failed")
            }
            None => tracing::error!(target: targets::SESSION, "session manager panicked during invalidation"),
        }
    }

    /// Show a message box over the active window, or application-wide when
    /// no window is open.
    pub fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction {
        if let Some(window) = self.active_window() {
            match window.show_message_box(message, actions) {
                Ok(action) => return action,
                Err(err) => {
                    tracing::warn!(target: targets::APPLICATION, error = %err, "window message box failed")
                }
            }
        }
        match self.view.lock().clone() {
            Some(view) => view.show_message_box(message, actions),
            None => DialogBoxAction::Cancel,
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.config.application_name)
            .field("toolkit", &self.toolkit.toolkit_id())
            .field("initialized", &self.is_initialized())
            .field("quit_state", &self.quit_state())
            .field("windows", &self.windows.len())
            .finish()
    }
}
