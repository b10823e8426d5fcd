// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - demo (default): run a simulated screen session against the bridge
// - config --show / --path / --reset: configuration management

use crate::config::{Config, VERSION};
use crate::demo::DEFAULT_LOCATION;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;

/// hostbridge - native <-> web view component bridge
#[derive(Parser, Debug)]
#[command(name = "hostbridge")]
#[command(version = VERSION)]
#[command(about = "Native/web view component bridge", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run a simulated screen session and print the scripts it evaluates
    Demo {
        /// Location the simulated screen was loaded from
        #[arg(long, default_value = DEFAULT_LOCATION)]
        location: String,

        /// Print captured bridge diagnostics after the session
        #[arg(long)]
        diagnostics: bool,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Don't ask before overwriting on --reset
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

impl Cli {
    /// Subcommand to run; `demo` with defaults when none was given
    pub fn command(self) -> Commands {
        self.command.unwrap_or(Commands::Demo {
            location: DEFAULT_LOCATION.to_string(),
            diagnostics: false,
        })
    }
}

/// Handle `config` subcommand flags
pub fn handle_config(show: bool, path: bool, reset: bool, yes: bool) -> anyhow::Result<()> {
    if path {
        handle_config_path()
    } else if show {
        handle_config_show()
    } else if reset {
        handle_config_reset(yes)
    } else {
        // No flag provided, show help
        println!("Usage: hostbridge config [--show|--path|--reset [--yes]]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --path    Show config file path");
        println!("  --reset   Reset config file to defaults");
        Ok(())
    }
}

fn config_path() -> anyhow::Result<std::path::PathBuf> {
    Config::config_path().context("could not determine config path (no home directory)")
}

fn handle_config_path() -> anyhow::Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn handle_config_show() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    println!();
    let path = config_path()?;
    if path.exists() {
        println!("# Source: {}", path.display());
    } else {
        println!("# Source: defaults (no config file)");
    }
    Ok(())
}

fn handle_config_reset(yes: bool) -> anyhow::Result<()> {
    let path = config_path()?;

    if path.exists() && !yes {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::default()
        .write_to(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

/// Print a config load failure with hints on how to fix it
pub fn print_config_error(error: &anyhow::Error) {
    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║  CONFIG ERROR - Failed to load configuration file            ║");
    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
    eprintln!("  Error: {:#}\n", error);
    eprintln!("  Tip: Check for:\n");
    eprintln!("    - Missing quotes around string values");
    eprintln!("    - Invalid boolean values (use true/false)");
    eprintln!("    - Typos in section names ([logging], [bridge])\n");
    eprintln!("  To reset, run `hostbridge config --reset`.\n");
}
