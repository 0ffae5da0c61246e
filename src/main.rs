//! # Nextwall
//!
//! Sets a random wallpaper from your collection, optionally one that fits the
//! daylight outside: dark wallpapers at night, bright ones during the day.
//!
//! ## Usage
//!
//! ```bash
//! # Catalogue wallpapers (once, and again after adding new ones)
//! nextwall scan -r ~/Pictures/Wallpapers
//!
//! # Set a new wallpaper
//! nextwall next ~/Pictures/Wallpapers
//!
//! # Set one that matches the time of day in Amsterdam
//! nextwall next -t -l 52.37:4.89 ~/Pictures/Wallpapers
//!
//! # Browse, delete and open wallpapers
//! nextwall interactive
//! ```
//!
//! ## Exit Status
//!
//! `0` on success, `1` on errors, `2` on usage errors, `3` when no (other)
//! wallpaper could be found.

use anyhow::{anyhow, Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::{info, warn, LevelFilter};
use nextwall::brightness::Brightness;
use nextwall::classifier::{self, NeuralNet};
use nextwall::cli::{self, SelectArgs};
use nextwall::completion;
use nextwall::config::{self, RuntimeConfig};
use nextwall::controller::Controller;
use nextwall::db;
use nextwall::desktop::{Desktop, Gnome};
use nextwall::features::ImageStatistics;
use nextwall::scanner::Scanner;
use nextwall::selection::{Selection, Selector};
use nextwall::solar;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit status when the catalog has nothing (else) to offer.
const EXIT_NO_WALLPAPER: u8 = 3;

/// Logging defaults to warnings; `-v` raises it, `RUST_LOG` overrides both.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Config file values overridden by global command line options.
fn runtime_config(args: &cli::Args) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::load()?;
    if let Some(db_path) = &args.db {
        config = config.with_db_path(db_path.clone());
    }
    if let Some(classifier_path) = &args.classifier {
        config.classifier_path = classifier_path.clone();
    }
    config.absolutize_paths()?;
    Ok(config)
}

fn load_classifier(config: &RuntimeConfig) -> Result<NeuralNet> {
    if config.uses_default_classifier() && !config.classifier_path.exists() {
        info!("No classifier data at {}, using the built-in network", config.classifier_path.display());
        return NeuralNet::from_json(classifier::REFERENCE_NET);
    }
    NeuralNet::load(&config.classifier_path)
}

/// Catalogued paths are canonical, so the directory we sample must be too.
fn wallpaper_dir(path: Option<&Path>, config: &RuntimeConfig) -> Result<PathBuf> {
    config::canonical_dir(path.unwrap_or(&config.wallpaper_dir))
}

/// Brightness to filter on: explicit, from the sun, or none.
fn target_brightness(select: &SelectArgs, config: &RuntimeConfig) -> Result<Option<Brightness>> {
    if !select.time {
        return Ok(select.brightness);
    }

    let Some(location) = select.location.or(config.location) else {
        cli::Args::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "--time needs a location: pass --location LAT:LON or set \"location\" in the config file",
            )
            .exit();
    };

    let now = chrono::Local::now();
    let brightness = solar::local_brightness(location, &now)
        .ok_or_else(|| anyhow!("Cannot tell whether it is day or night at {location} today"))?;
    info!("It is {brightness} at {location}");
    Ok(Some(brightness))
}

fn selector(dir: &Path, brightness: Option<Brightness>, config: &RuntimeConfig) -> Result<Selector> {
    let base = dir
        .to_str()
        .with_context(|| format!("Wallpaper directory {} is not valid UTF-8", dir.display()))?;
    Ok(Selector::new(base, brightness)
        .with_sample_limit(config.sample_limit)
        .with_retry_limit(config.retry_limit))
}

fn scan(config: &RuntimeConfig, path: Option<&Path>, recursive: bool) -> Result<ExitCode> {
    let dir = wallpaper_dir(path, config)?;
    let mut conn = db::open_catalog(&config.db_path)?;
    let net = load_classifier(config)?;

    info!("Scanning {} for new wallpapers", dir.display());
    let report = Scanner::new(&ImageStatistics, &net).scan(&mut conn, &dir, recursive)?;

    println!("Found {} new wallpapers", report.found);
    if report.failed > 0 {
        println!("{} files could not be read (run with -v for details)", report.failed);
    }
    Ok(ExitCode::SUCCESS)
}

fn next(config: &RuntimeConfig, select: &SelectArgs) -> Result<ExitCode> {
    let dir = wallpaper_dir(select.path.as_deref(), config)?;
    let brightness = target_brightness(select, config)?;
    let conn = db::open_catalog(&config.db_path)?;
    let desktop = Gnome;

    let current = desktop.background().unwrap_or_else(|err| {
        warn!("Cannot read the current background: {err:#}");
        None
    });

    match selector(&dir, brightness, config)?.next_wallpaper(&conn, current.as_deref())? {
        Selection::Wallpaper(path) => {
            desktop.set_background(&path)?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Selection::NoCandidates => {
            eprintln!(
                "No matching wallpapers in {}. Try `nextwall scan {}` first.",
                dir.display(),
                dir.display()
            );
            Ok(ExitCode::from(EXIT_NO_WALLPAPER))
        }
        Selection::Exhausted { retries } => {
            eprintln!(
                "Only the current wallpaper matches ({retries} tries). Try a different directory or brightness."
            );
            Ok(ExitCode::from(EXIT_NO_WALLPAPER))
        }
    }
}

fn interactive(config: &RuntimeConfig, select: &SelectArgs) -> Result<ExitCode> {
    let dir = wallpaper_dir(select.path.as_deref(), config)?;
    let brightness = target_brightness(select, config)?;
    let conn = db::open_catalog(&config.db_path)?;
    let desktop = Gnome;

    println!("Type 'help' for a list of commands.");
    let mut controller = Controller::new(&conn, &desktop, selector(&dir, brightness, config)?);
    controller.run(io::stdin().lock(), io::stdout().lock())?;
    Ok(ExitCode::SUCCESS)
}

fn stats(config: &RuntimeConfig) -> Result<ExitCode> {
    let conn = db::open_catalog(&config.db_path)?;
    let version = db::catalog_version(&conn)?.unwrap_or_else(|| "unknown".to_string());

    println!("Database: {} (version {version})", config.db_path.display());
    println!("Wallpapers: {}", db::count(&conn)?);
    for (brightness, n) in db::count_by_brightness(&conn)? {
        match brightness {
            Some(b) => println!("  {:<9} {n}", format!("{b}:")),
            None => println!("  {:<9} {n}", "unknown:"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Main entry point for nextwall.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the library.
fn main() -> Result<ExitCode> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    if let cli::Command::Completion { shell } = args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(ExitCode::SUCCESS);
    }

    let config = runtime_config(&args)?;

    match &args.command {
        cli::Command::Scan { path, recursive } => scan(&config, path.as_deref(), *recursive),
        cli::Command::Next { select } => next(&config, select),
        cli::Command::Interactive { select } => interactive(&config, select),
        cli::Command::Stats => stats(&config),
        cli::Command::Completion { .. } => Ok(ExitCode::SUCCESS),
    }
}
