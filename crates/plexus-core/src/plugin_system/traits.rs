use crate::plugin_system::context::PluginContext;

/// Result type returned by activator hooks.
pub type ActivatorResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Optional entry point of a plugin, invoked when it starts and stops.
///
/// Activators are registered in a [`ModuleRegistry`](super::ModuleRegistry)
/// under the owning plugin's id and looked up when the plugin starts.
pub trait Activator: Send + Sync {
    /// Called after the plugin context exists and before declared services
    /// and extensions are registered. An error aborts the start.
    fn start(&self, context: &PluginContext) -> ActivatorResult;

    /// Called while the plugin is stopping. Errors are logged and ignored.
    fn stop(&self, _context: &PluginContext) -> ActivatorResult {
        Ok(())
    }
}
