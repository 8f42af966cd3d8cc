use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use docwatch::config::Settings;
use docwatch::convert::{CommandFormatter, MarkdownAssembler};
use docwatch::logging;
use docwatch::pipeline::ConversionPipeline;
use docwatch::watcher::{DirectoryWatcher, EventFilter};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "docwatch")]
#[command(about = "Watches directories and converts structured documents as they appear")]
struct Cli {
    /// Path to the configuration file (default: docwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch directories and convert matching files as they are created
    Watch {
        /// Root directories to watch; overrides the configured roots
        roots: Vec<PathBuf>,
    },

    /// Create a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => match Settings::init_config_file(force) {
            Ok(path) => {
                println!("Created configuration at: {}", path.display());
                Ok(())
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },

        Commands::Config => {
            let settings = load_or_exit(cli.config.as_deref());
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }

        Commands::Watch { roots } => {
            let settings = load_or_exit(cli.config.as_deref());
            run_watch(settings, roots).await
        }
    }
}

fn load_or_exit(config_file: Option<&Path>) -> Settings {
    match Settings::load(config_file) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_watch(settings: Settings, cli_roots: Vec<PathBuf>) -> anyhow::Result<()> {
    logging::init_with_config(&settings.logging);
    logging::purge_old_logs(&settings.logging.dir, settings.logging.retention_days);

    tracing::info!("----- starting docwatch -----");

    let mut roots = if cli_roots.is_empty() {
        settings.watch.roots.clone()
    } else {
        cli_roots
    };
    if roots.is_empty() {
        roots = collect_roots_interactively()?;
    }
    if roots.is_empty() {
        tracing::error!("no directories provided to watch, exiting");
        std::process::exit(1);
    }

    let filter = EventFilter::new(
        &settings.filter.prefix,
        &settings.filter.input_extension,
        &settings.convert.final_extension,
    );
    let pipeline = Arc::new(ConversionPipeline::new(
        Arc::new(CommandFormatter::new(
            settings.convert.formatter_program.as_str(),
        )),
        Arc::new(MarkdownAssembler::new()),
        settings.convert.intermediate_format.clone(),
        settings.convert.final_extension.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!("failed to listen for interrupt: {e}");
                // Keep the channel open; the watcher would otherwise read a
                // dropped sender as an immediate shutdown.
                std::future::pending::<()>().await;
            }
        }
    });

    let watcher = DirectoryWatcher::builder()
        .roots(roots)
        .filter(filter)
        .pipeline(pipeline)
        .shutdown(shutdown_rx)
        .build()?;

    watcher.watch().await?;
    Ok(())
}

/// Prompt for root paths on stdin, one per line; a blank line finishes.
fn collect_roots_interactively() -> anyhow::Result<Vec<PathBuf>> {
    println!("Enter directories to monitor (one per line). Press Enter on a blank line to finish:");

    let stdin = std::io::stdin();
    let mut roots = Vec::new();
    loop {
        print!("Enter path: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        roots.push(PathBuf::from(trimmed));
    }

    Ok(roots)
}
