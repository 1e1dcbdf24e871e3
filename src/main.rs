//! `cef-probe` command line.
//!
//! ```text
//! cef-probe targets
//! cef-probe dump-scripts --out dumps
//! cef-probe inject a.js b.js
//! cef-probe snapshot --name main.html
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cef_probe::{
    Connection, ConsoleEntry, DirectorySink, Evaluation, Injector, ProbeConfig, ResourceFetcher,
    Result, ScriptCatalog, TargetDiscovery, capture_dom, html_file_name, save_snapshot,
    snapshot_file_name,
};

// ============================================================================
// Arguments
// ============================================================================

/// DevTools protocol client for Chromium-embedded applications.
#[derive(Parser, Debug)]
#[command(name = "cef-probe", version, about)]
struct Cli {
    /// Remote-debugging port on localhost
    #[arg(long, global = true, default_value_t = 9222)]
    port: u16,

    /// Full remote-debugging base URL (overrides --port)
    #[arg(long, global = true)]
    base: Option<String>,

    /// Preferred target title substring
    #[arg(long, global = true)]
    title: Option<String>,

    /// Attach to the first page target regardless of title
    #[arg(long, global = true, conflicts_with = "title")]
    any_title: bool,

    /// Number of discovery polls
    #[arg(long, global = true)]
    attempts: Option<u32>,

    /// Output root for dumped files
    #[arg(long, global = true, default_value = "dumps")]
    out: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the targets of the debugging endpoint
    Targets,

    /// Download every script the renderer has parsed
    DumpScripts {
        /// Script collection window in seconds
        #[arg(long)]
        scan_secs: Option<u64>,
    },

    /// Reload the page, inject scripts and relay console output
    Inject {
        /// Script files, concatenated in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Save the serialized DOM of the current page
    Snapshot {
        /// File name under <out>/dom (".html" is appended if missing)
        #[arg(long)]
        name: Option<String>,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Installs the subscriber; `RUST_LOG` overrides the default filter.
fn init_logging(debug: bool) {
    let default = if debug { "cef_probe=debug" } else { "cef_probe=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(cli: &Cli, scan_secs: Option<u64>) -> Result<ProbeConfig> {
    let mut builder = ProbeConfig::builder().port(cli.port).output_root(&cli.out);

    if let Some(base) = &cli.base {
        builder = builder.debug_base(base);
    }
    if let Some(title) = &cli.title {
        builder = builder.preferred_title(title);
    }
    if cli.any_title {
        builder = builder.no_preferred_title();
    }
    if let Some(attempts) = cli.attempts {
        builder = builder.discovery_attempts(attempts);
    }
    if let Some(secs) = scan_secs {
        builder = builder.scan_window(Duration::from_secs(secs));
    }

    builder.build()
}

// ============================================================================
// Commands
// ============================================================================

async fn run(cli: Cli) -> Result<ExitCode> {
    let scan_secs = match &cli.command {
        Commands::DumpScripts { scan_secs } => *scan_secs,
        _ => None,
    };
    let config = build_config(&cli, scan_secs)?;
    let discovery = TargetDiscovery::new(&config)?;

    // Scripts are read before attaching.
    let script = match &cli.command {
        Commands::Inject { files } => Some(load_script(files)?),
        _ => None,
    };

    if matches!(cli.command, Commands::Targets) {
        for target in discovery.list().await? {
            println!("{:<16} {:<40} {}", target.kind, target.title, target.locator);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(address) = discovery.discover().await.and_then(|t| t.control_address) else {
        eprintln!(
            "Could not find a debugging target at {}.\n\
             Ensure the application runs with --remote-debugging-port={}",
            discovery.endpoint(),
            config.debug_base().port_or_known_default().unwrap_or(cli.port),
        );
        return Ok(ExitCode::FAILURE);
    };

    info!(%address, "Connecting");
    let mut connection = Connection::connect(&address)
        .await?
        .with_command_timeout(config.command_timeout());

    match cli.command {
        Commands::Targets => Ok(ExitCode::SUCCESS),
        Commands::DumpScripts { .. } => dump_scripts(&config, &mut connection).await,
        Commands::Inject { .. } => {
            inject(&config, &mut connection, script.as_deref().unwrap_or_default()).await
        }
        Commands::Snapshot { name } => snapshot(&config, &mut connection, name).await,
    }
}

async fn dump_scripts(config: &ProbeConfig, connection: &mut Connection) -> Result<ExitCode> {
    let catalog =
        ScriptCatalog::collect(connection, config.scan_window(), config.scan_poll()).await;
    let catalog = match catalog {
        Ok(catalog) => catalog,
        Err(e) => {
            connection.close().await;
            return Err(e);
        }
    };

    let mut sink = DirectorySink::new(config.output_root());
    let report = ResourceFetcher::from_config(config)
        .fetch_all(connection, &catalog, &mut sink)
        .await;
    connection.close().await;

    println!(
        "Saved {} of {} scripts to '{}' ({} empty, {} failed)",
        report.saved,
        catalog.len(),
        sink.root().display(),
        report.skipped,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  {} ({}): {}", failure.locator, failure.script_id, failure.error);
    }

    Ok(match report.aborted {
        Some(e) => {
            eprintln!("Download aborted: {e}");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    })
}

async fn inject(config: &ProbeConfig, connection: &mut Connection, script: &str) -> Result<ExitCode> {
    let mut print = |entry: ConsoleEntry| {
        if entry.is_error() {
            eprintln!("{entry}");
        } else {
            println!("{entry}");
        }
    };

    println!("Monitoring console output. Press Ctrl+C to stop.");
    let report = Injector::from_config(config)
        .run(connection, script, &mut print, tokio::signal::ctrl_c())
        .await?;

    match &report.evaluation {
        Evaluation::Completed => println!("Script injected ({} console entries)", report.relayed),
        Evaluation::Threw(description) => eprintln!("Script exception: {description}"),
        Evaluation::Failed(message) => eprintln!("Injection error: {message}"),
    }
    Ok(ExitCode::SUCCESS)
}

async fn snapshot(
    config: &ProbeConfig,
    connection: &mut Connection,
    name: Option<String>,
) -> Result<ExitCode> {
    let html = capture_dom(connection).await;
    connection.close().await;

    let name = name.map_or_else(|| snapshot_file_name(&Local::now()), |n| html_file_name(&n));
    let path = save_snapshot(config.output_root(), &name, &html?)?;
    println!("DOM saved to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

/// Concatenates script files, each followed by a newline.
fn load_script(files: &[PathBuf]) -> Result<String> {
    files.iter().try_fold(String::new(), |mut script, path: &PathBuf| {
        script.push_str(&read_script(path)?);
        script.push('\n');
        Ok(script)
    })
}

fn read_script(path: &Path) -> Result<String> {
    let source = fs::read_to_string(path)?;
    info!(path = %path.display(), bytes = source.len(), "Script loaded");
    Ok(source)
}
