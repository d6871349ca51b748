mod cli;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::{error, info};
use plexus_core::config::RuntimeConfig;
use plexus_core::kernel::constants::{APP_NAME, APP_VERSION};
use plexus_core::plugin_system::StartReport;
use plexus_core::{Framework, ModuleRegistry};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Commands, PluginCommand};

/// Loads the configuration file (if any) and applies the command-line overrides.
fn load_config(args: &CliArgs) -> Result<RuntimeConfig, plexus_core::KernelError> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if !args.plugins_dirs.is_empty() {
        config.plugin_dirs = args.plugins_dirs.clone();
    }
    if let Some(level) = args.start_level {
        config.start_level = level;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

/// Routes `log` records into a `tracing` fmt subscriber writing to stderr.
fn init_logging(level: &str) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

/// Code for every plugin shipped with the host.
fn static_modules() -> ModuleRegistry {
    let mut modules = ModuleRegistry::new();
    core_status::register(&mut modules);
    modules
}

fn print_report(report: &StartReport) {
    println!(
        "Started {} plugins, {} failed",
        report.started.len(),
        report.failed.len()
    );
    for (id, reason) in &report.failed {
        println!("  failed: {}: {}", id, reason);
    }
}

fn list_plugins(framework: &Framework) {
    let plugins = framework.get_plugins();
    if plugins.is_empty() {
        println!("No plugins installed.");
        return;
    }
    for plugin in plugins {
        let resolved = if framework.is_resolve_success(plugin.id()) {
            "resolved"
        } else {
            "unresolved"
        };
        println!(
            "{} {} {} {} {}",
            plugin.id(),
            plugin.version(),
            plugin.configuration().start_level(),
            plugin.state(),
            resolved
        );
    }
}

fn print_chain(framework: &Framework, id: &str) -> ExitCode {
    match framework.dependency_chain(id) {
        Some(chain) if chain.is_empty() => {
            println!("{} has no dependencies", id);
            ExitCode::SUCCESS
        }
        Some(chain) => {
            println!("{}: {}", id, chain.join(" -> "));
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("Error: plugin '{}' is not installed", id);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let Some(command) = &args.command else {
        // Nothing to do without a command.
        if let Err(e) = CliArgs::command().print_help() {
            eprintln!("Failed to print help: {}", e);
        }
        return ExitCode::SUCCESS;
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    info!("{} {} starting", APP_NAME, APP_VERSION);
    let framework = Framework::new(config, static_modules());
    let report = match framework.start().await {
        Ok(report) => report,
        Err(e) => {
            error!("Framework failed to start: {}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match command {
        Commands::Run { once } => {
            println!("{} {} running at start level {}", APP_NAME, APP_VERSION, framework.start_level());
            print_report(&report);
            if !once {
                println!("Press Ctrl-C to stop.");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
            }
            ExitCode::SUCCESS
        }
        Commands::Plugin { command: PluginCommand::List } => {
            list_plugins(&framework);
            ExitCode::SUCCESS
        }
        Commands::Plugin {
            command: PluginCommand::Chain { id },
        } => print_chain(&framework, id),
    };

    framework.stop();
    info!("{} stopped", APP_NAME);
    code
}
