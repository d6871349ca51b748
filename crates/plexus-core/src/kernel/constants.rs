/// Runtime name
pub const APP_NAME: &str = "Plexus";

/// Runtime version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of a plugin descriptor inside a plugin directory
pub const DESCRIPTOR_FILE_NAME: &str = "plugin.json";

/// Default plugins directory
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Start level of a plugin whose descriptor sets none
pub const DEFAULT_PLUGIN_START_LEVEL: i32 = 50;

/// Start level of a framework whose configuration sets none
pub const DEFAULT_FRAMEWORK_START_LEVEL: i32 = 100;

/// Module path looked up when a plugin configures no activator
pub const DEFAULT_ACTIVATOR_PATH: &str = "Activator";

/// Version assumed when a descriptor omits one
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Default log level filter
pub const DEFAULT_LOG_LEVEL: &str = "info";
