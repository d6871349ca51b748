#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::kernel::Framework;
use crate::plugin_system::{
    Activator, ActivatorResult, ConfigurationBuilder, PluginConfiguration, PluginContext, Version,
};

/// Shared, ordered record of what happened during a test.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn v(version: &str) -> Version {
    Version::parse(version).unwrap()
}

/// Builder preset with an id and a version.
pub fn plugin(id: &str, version: &str) -> ConfigurationBuilder {
    PluginConfiguration::builder(id).version(v(version))
}

// ===== MOCK ACTIVATORS =====

/// Activator that logs `<id>:start` / `<id>:stop` and can be told to misbehave.
#[derive(Clone)]
pub struct RecordingActivator {
    pub id: String,
    pub log: EventLog,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub panic_stop: bool,
}

impl RecordingActivator {
    pub fn new(id: &str, log: &EventLog) -> Self {
        Self {
            id: id.to_string(),
            log: Arc::clone(log),
            fail_start: false,
            fail_stop: false,
            panic_stop: false,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn panicking_stop(mut self) -> Self {
        self.panic_stop = true;
        self
    }
}

impl Activator for RecordingActivator {
    fn start(&self, _context: &PluginContext) -> ActivatorResult {
        self.log.lock().unwrap().push(format!("{}:start", self.id));
        if self.fail_start {
            return Err(format!("{} refused to start", self.id).into());
        }
        Ok(())
    }

    fn stop(&self, _context: &PluginContext) -> ActivatorResult {
        self.log.lock().unwrap().push(format!("{}:stop", self.id));
        if self.panic_stop {
            panic!("{} panicked while stopping", self.id);
        }
        if self.fail_stop {
            return Err(format!("{} refused to stop", self.id).into());
        }
        Ok(())
    }
}

/// Records every plugin state change as `<id>:<state>`.
pub fn record_plugin_states(framework: &Framework) -> EventLog {
    let log = new_log();
    let sink = Arc::clone(&log);
    framework.add_plugin_state_listener(move |event| {
        sink.lock()
            .unwrap()
            .push(format!("{}:{}", event.plugin_id, event.current));
        Ok(())
    });
    log
}

/// Position of `entry` in `log`, panicking with the whole log if absent.
pub fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("'{entry}' not found in {log:?}"))
}

// ===== PLUGIN DIRECTORIES =====

/// Writes `<root>/<dir_name>/plugin.json` and returns the plugin directory.
pub fn write_descriptor(root: &Path, dir_name: &str, json: &str) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plugin.json"), json).unwrap();
    dir
}
