// hostbridge - native <-> web view component bridge
//
// The library routes messages between embedded web content and native
// components owned by a screen. This binary hosts a simulated screen so the
// routing, gating and lifecycle behaviour can be watched end to end.
//
// Architecture:
// - Config: env > ~/.config/hostbridge/config.toml > defaults
// - Logging: tracing to stderr, optional JSON files, optional in-memory capture
// - Demo: a LocalSet-hosted screen fed by a simulated web thread

use clap::Parser;
use hostbridge::cli::{self, Cli, Commands};
use hostbridge::config::Config;
use hostbridge::demo;
use hostbridge::logging::{self, DiagnosticBuffer, LogLevel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command() {
        Commands::Config {
            show,
            path,
            reset,
            yes,
        } => cli::handle_config(show, path, reset, yes),
        Commands::Demo {
            location,
            diagnostics,
        } => run_demo(&location, diagnostics).await,
    }
}

async fn run_demo(location: &str, diagnostics: bool) -> anyhow::Result<()> {
    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            cli::print_config_error(&e);
            std::process::exit(1);
        }
    };

    // --diagnostics forces capture on regardless of config
    let capture = (diagnostics || config.logging.capture).then(DiagnosticBuffer::new);

    // The guard must outlive every log call so the file writer flushes
    let _file_guard = logging::init(&config.logging, capture.clone())?;

    tracing::info!(
        version = hostbridge::config::VERSION,
        namespace = %config.bridge.script_namespace,
        "starting demo session"
    );

    println!("Screen at {}", location);
    let summary = demo::run_demo(location, &config.bridge, true).await?;
    println!();
    println!(
        "{} scripts evaluated, {} of {} inbound envelopes accepted",
        summary.scripts.len(),
        summary.accepted,
        summary.posted
    );

    if let Some(buffer) = capture {
        println!();
        println!("Bridge diagnostics ({} captured):", buffer.len());
        for entry in buffer.at_least(LogLevel::Debug) {
            let fields = entry
                .fields
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "  {} {:<5} {} {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.level.as_str(),
                entry.message,
                fields
            );
        }
    }

    Ok(())
}
