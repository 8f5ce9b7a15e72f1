mod commands;
mod logging;
mod progress;

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use symlink_dedupe_core::{AppConfig, DedupeEngine, StagingState};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    if let Err(err) = run(args) {
        error!("{:#}", err);
        process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let config = symlink_dedupe_core::config::load_configuration()
        .context("Error loading configuration")?;

    let package_dir = match args.dir {
        Some(dir) => dir,
        None => env::current_dir().context("Cannot determine the current directory")?,
    };

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run_pipeline(config, &package_dir),
        Commands::List => run_list(config, &package_dir),
        Commands::Status => run_status(&package_dir),
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
    }
}

fn run_pipeline(config: AppConfig, package_dir: &Path) -> Result<()> {
    let engine = DedupeEngine::new(config);
    let reporter = CliReporter::new();

    let summary = engine
        .run(package_dir, &reporter)
        .with_context(|| format!("Dedupe of {} failed", package_dir.display()))?;

    let phases: Vec<String> = summary
        .phase_durations
        .iter()
        .map(|(phase, duration)| format!("{} {:.2}s", phase, duration.as_secs_f64()))
        .collect();
    info!("{}", phases.join(", "));
    info!(
        "{} linked modules staged behind {} links, done in {}",
        format!("{}", summary.modules).cyan(),
        format!("{}", summary.symlinks).cyan(),
        format!("{:.2}s", summary.total_duration.as_secs_f64()).green(),
    );

    Ok(())
}

fn run_list(config: AppConfig, package_dir: &Path) -> Result<()> {
    let engine = DedupeEngine::new(config);
    let classification = engine
        .discover(package_dir)
        .with_context(|| format!("Scanning {} failed", package_dir.display()))?;

    if classification.is_empty() {
        println!("No linked modules in {}", package_dir.display());
        return Ok(());
    }

    println!("{}", "Linked modules:".bold());
    for module in &classification.modules {
        let via = if module.has_symlinked_scope() {
            " (via linked scope)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} -> {}{}",
            module.name.cyan(),
            module.target.display(),
            via
        );
    }

    println!("{}", "Links restored after dedupe:".bold());
    for link in &classification.symlinks {
        println!("  {} -> {}", relative(&link.path, package_dir), link.target.display());
    }

    Ok(())
}

fn run_status(package_dir: &Path) -> Result<()> {
    match StagingState::load(package_dir)? {
        None => {
            println!("{} is idle", package_dir.display());
        }
        Some(state) => {
            println!(
                "{} run started {} stopped in phase {}",
                "Staged:".red().bold(),
                state.started_at.to_rfc3339(),
                state.phase.to_string().yellow()
            );
            if let Some(failure) = &state.failure {
                println!("  cause: {}", failure);
            }
            println!("Links to restore:");
            for link in &state.symlinks {
                println!("  {} -> {}", link.path.display(), link.target.display());
            }
        }
    }
    Ok(())
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
