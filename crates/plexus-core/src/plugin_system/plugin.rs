//! # Plexus Core Plugin
//!
//! A [`Plugin`] is one installed unit and its lifecycle state machine:
//!
//! ```text
//! INSTALLED -> RESOLVED -> STARTING -> ACTIVE -> STOPPING -> RESOLVED
//!                         (any state) -> UNINSTALLED
//! ```
//!
//! A plugin leaves INSTALLED only once the resolver reports it resolved. A
//! failed start rolls the plugin back to RESOLVED and returns the error; a
//! stop always ends in RESOLVED with its context cleared.
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, error, info, warn};

use crate::event::PluginStateChanged;
use crate::kernel::error::Result;
use crate::kernel::{FrameworkCore, FrameworkState};
use crate::plugin_system::configuration::PluginConfiguration;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::{panic_message, CodeLoader, Component, ModuleRegistry};
use crate::plugin_system::state::PluginState;
use crate::plugin_system::traits::{Activator, ActivatorResult};
use crate::plugin_system::version::Version;

pub struct Plugin {
    configuration: PluginConfiguration,
    loader: CodeLoader,
    core: Weak<FrameworkCore>,
    this: Weak<Plugin>,
    state: Mutex<PluginState>,
    context: Mutex<Option<Arc<PluginContext>>>,
    activator: Mutex<Option<Box<dyn Activator>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs an activator hook, turning panics into errors.
fn call_activator(plugin_id: &str, phase: &'static str, hook: impl FnOnce() -> ActivatorResult) -> Result<()> {
    let message = match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload)),
    };
    Err(PluginSystemError::ActivatorFailed {
        plugin_id: plugin_id.to_string(),
        phase,
        message,
    }
    .into())
}

impl Plugin {
    pub(crate) fn new(
        configuration: PluginConfiguration,
        core: Weak<FrameworkCore>,
        modules: Arc<ModuleRegistry>,
    ) -> Arc<Self> {
        let loader = CodeLoader::new(configuration.id(), modules);
        Arc::new_cyclic(|this| Plugin {
            configuration,
            loader,
            core,
            this: this.clone(),
            state: Mutex::new(PluginState::Installed),
            context: Mutex::new(None),
            activator: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        self.configuration.id()
    }

    pub fn name(&self) -> &str {
        self.configuration.name()
    }

    pub fn version(&self) -> Version {
        self.configuration.version()
    }

    pub fn configuration(&self) -> &PluginConfiguration {
        &self.configuration
    }

    pub fn state(&self) -> PluginState {
        *lock(&self.state)
    }

    /// The live context; only present between STARTING and the end of a stop.
    pub fn context(&self) -> Option<Arc<PluginContext>> {
        lock(&self.context).clone()
    }

    fn core(&self) -> Result<Arc<FrameworkCore>> {
        self.core.upgrade().ok_or_else(|| {
            PluginSystemError::FrameworkUnavailable {
                plugin_id: self.id().to_string(),
            }
            .into()
        })
    }

    fn uninstalled(&self, action: &str) -> PluginSystemError {
        PluginSystemError::Uninstalled {
            plugin_id: self.id().to_string(),
            action: action.to_string(),
        }
    }

    fn fire(&self, previous: PluginState, current: PluginState) {
        if let Some(core) = self.core.upgrade() {
            core.events.fire_plugin_state_changed(PluginStateChanged {
                plugin_id: self.id().to_string(),
                previous: Some(previous),
                current,
            });
        }
    }

    fn set_state(&self, next: PluginState) {
        let previous = std::mem::replace(&mut *lock(&self.state), next);
        if previous != next {
            self.fire(previous, next);
        }
    }

    /// Moves `from -> to` only if the plugin is still in `from`.
    fn transition(&self, from: PluginState, to: PluginState) -> bool {
        {
            let mut state = lock(&self.state);
            if *state != from {
                return false;
            }
            *state = to;
        }
        self.fire(from, to);
        true
    }

    /// Moves INSTALLED to RESOLVED if the resolver agrees, otherwise fails `action`.
    ///
    /// Every recorded failure cause is logged. The plugin stays INSTALLED on failure.
    fn assert_resolved(&self, core: &FrameworkCore, action: &str) -> Result<()> {
        if self.state() != PluginState::Installed {
            return Ok(());
        }

        let causes = {
            let resolver = core.resolver();
            if resolver.is_resolve_success(self.id()) {
                None
            } else {
                Some(resolver.failure_causes(self.id()))
            }
        };

        match causes {
            None => {
                self.transition(PluginState::Installed, PluginState::Resolved);
                Ok(())
            }
            Some(causes) => {
                if causes.is_empty() {
                    error!("Plugin {} is unknown to the resolver", self.id());
                }
                for cause in &causes {
                    error!("{}", cause);
                }
                Err(PluginSystemError::Unresolved {
                    plugin_id: self.id().to_string(),
                    action: action.to_string(),
                    causes,
                }
                .into())
            }
        }
    }

    /// Starts the plugin: activator first, then its declared services and extensions.
    ///
    /// Does nothing if the plugin is already ACTIVE. On any failure after
    /// entering STARTING the plugin is rolled back to RESOLVED and the error
    /// is returned.
    pub fn start(&self) -> Result<()> {
        match self.state() {
            PluginState::Uninstalled => return Err(self.uninstalled("start").into()),
            PluginState::Active => return Ok(()),
            state @ (PluginState::Starting | PluginState::Stopping) => {
                return Err(PluginSystemError::TransitionInProgress {
                    plugin_id: self.id().to_string(),
                    state,
                }
                .into());
            }
            PluginState::Installed | PluginState::Resolved => {}
        }

        let core = self.core()?;
        let framework_level = core.start_level();
        if self.configuration.start_level() > framework_level {
            let err = PluginSystemError::StartLevelExceeded {
                plugin_id: self.id().to_string(),
                plugin_level: self.configuration.start_level(),
                framework_level,
            };
            error!("{}", err);
            return Err(err.into());
        }
        self.assert_resolved(&core, "start")?;

        if !self.transition(PluginState::Resolved, PluginState::Starting) {
            return Err(PluginSystemError::TransitionInProgress {
                plugin_id: self.id().to_string(),
                state: self.state(),
            }
            .into());
        }
        info!("Plugin {} is starting", self.id());

        match self.activate(&core) {
            Ok(()) => {
                self.set_state(PluginState::Active);
                info!("Plugin {} {} is active", self.id(), self.version());
                Ok(())
            }
            Err(e) => {
                error!("Plugin {} failed to start: {}", self.id(), e);
                self.rollback_start();
                Err(e)
            }
        }
    }

    fn activate(&self, core: &Arc<FrameworkCore>) -> Result<()> {
        let context = Arc::new(PluginContext::new(
            self.this.clone(),
            &self.configuration,
            Arc::downgrade(core),
        ));
        *lock(&self.context) = Some(Arc::clone(&context));

        if let Some(activator) = self.resolve_activator()? {
            call_activator(self.id(), "start", || activator.start(&context))?;
            *lock(&self.activator) = Some(activator);
        }

        context.start(&self.loader, &self.configuration)
    }

    /// The configured activator, else the one at the default path, else none.
    fn resolve_activator(&self) -> Result<Option<Box<dyn Activator>>> {
        match self.configuration.activator() {
            Some(path) => match self.loader.load_activator(path)? {
                Some(activator) => Ok(Some(activator)),
                None => Err(PluginSystemError::ActivatorNotFound {
                    plugin_id: self.id().to_string(),
                    path: path.to_string(),
                }
                .into()),
            },
            None => Ok(self.loader.load_activator(self.configuration.default_activator())?),
        }
    }

    fn rollback_start(&self) {
        let activator = lock(&self.activator).take();
        drop(activator);
        let context = lock(&self.context).take();
        if let Some(context) = context {
            context.stop();
            context.dispose();
        }
        self.set_state(PluginState::Resolved);
    }

    /// Stops an ACTIVE plugin; INSTALLED and RESOLVED plugins are left as is.
    ///
    /// Rejected for uninstalled plugins, for plugins in a transition and for
    /// non-stoppable plugins while the framework is STARTED. Failures of the
    /// activator's stop hook or of the context cleanup are logged, and the
    /// plugin always ends in RESOLVED.
    pub fn stop(&self) -> Result<()> {
        if self.state() == PluginState::Uninstalled {
            return Err(self.uninstalled("stop").into());
        }
        if !self.configuration.stoppable()
            && self
                .core
                .upgrade()
                .is_some_and(|core| core.state() == FrameworkState::Started)
        {
            return Err(PluginSystemError::NotStoppable {
                plugin_id: self.id().to_string(),
            }
            .into());
        }

        if let state @ (PluginState::Starting | PluginState::Stopping) = self.state() {
            return Err(PluginSystemError::TransitionInProgress {
                plugin_id: self.id().to_string(),
                state,
            }
            .into());
        }
        if !self.transition(PluginState::Active, PluginState::Stopping) {
            debug!("Plugin {} is {}; nothing to stop", self.id(), self.state());
            return Ok(());
        }
        info!("Plugin {} is stopping", self.id());

        let context = lock(&self.context).take();
        let activator = lock(&self.activator).take();
        if let (Some(activator), Some(context)) = (&activator, &context) {
            if let Err(e) = call_activator(self.id(), "stop", || activator.stop(context)) {
                warn!("{}", e);
            }
        }

        if let Some(context) = context {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| context.stop())) {
                warn!(
                    "Cleaning up the context of plugin {} panicked: {}",
                    self.id(),
                    panic_message(payload)
                );
            }
            context.dispose();
        }

        self.set_state(PluginState::Resolved);
        info!("Plugin {} stopped", self.id());
        Ok(())
    }

    /// Stops the plugin and marks it UNINSTALLED for good.
    pub fn uninstall(&self) -> Result<()> {
        self.stop()?;
        self.set_state(PluginState::Uninstalled);
        info!("Plugin {} uninstalled", self.id());
        Ok(())
    }

    /// Instantiates a component registered for this plugin.
    ///
    /// The plugin must be resolvable. A missing component is logged and yields `None`;
    /// a panicking factory yields [`PluginSystemError::ModuleFailed`].
    pub fn load_class(&self, path: &str) -> Result<Option<Component>> {
        if self.state() == PluginState::Uninstalled {
            return Err(self.uninstalled("load classes").into());
        }
        let core = self.core()?;
        self.assert_resolved(&core, "load classes")?;
        Ok(self.loader.load(path)?)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id())
            .field("version", &self.version())
            .field("start_level", &self.configuration.start_level())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
