use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Plexus: an in-process plugin runtime
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Print "pong" and exit
    #[arg(long)]
    pub ping: bool,

    /// Runtime configuration file (.json, .yaml, .yml or .toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Plugins directory to scan; repeatable, replaces the configured list
    #[arg(long = "plugins-dir", global = true, value_name = "DIR")]
    pub plugins_dirs: Vec<PathBuf>,

    /// Framework start level; plugins above it are not started
    #[arg(long, global = true, value_name = "N")]
    pub start_level: Option<i32>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the framework and keep it running until Ctrl-C
    Run {
        /// Stop again right after startup
        #[arg(long)]
        once: bool,
    },
    /// Inspect plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    /// List installed plugins with their state
    List,
    /// Print the transitive dependencies of a plugin
    Chain {
        /// Plugin id
        id: String,
    },
}
