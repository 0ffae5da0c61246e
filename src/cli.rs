//! # Command-Line Interface Module
//!
//! Clap definitions for the `nextwall` binary.
//!
//! ## Commands
//!
//! - `scan`: Catalogue new wallpapers in a directory
//! - `next`: Set a new random wallpaper and exit
//! - `interactive`: Browse wallpapers one by one
//! - `stats`: Show what the catalog contains
//! - `completion`: Print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! nextwall scan -r ~/Pictures/Wallpapers
//! nextwall next -t -l 52.37:4.89 ~/Pictures/Wallpapers
//! nextwall interactive -b 0
//! ```

use crate::brightness::Brightness;
use crate::solar::Location;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "nextwall")]
#[command(about = "Nextwall: a wallpaper rotator with some sense of time")]
#[command(version)]
pub struct Args {
    /// Show more log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Use this wallpaper database instead of the default one
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Use these brightness classifier weights (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub classifier: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Which wallpapers are eligible.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Wallpaper directory (defaults to the configured one)
    pub path: Option<PathBuf>,

    /// Only pick wallpapers of this brightness: 0 night, 1 twilight, 2 day
    #[arg(short, long, value_name = "0|1|2", conflicts_with = "time")]
    pub brightness: Option<Brightness>,

    /// Pick wallpapers matching the current daylight at your location
    ///
    /// Uses the sunrise, sunset and civil twilight times for today. Needs a
    /// location, from --location or the config file.
    #[arg(short, long)]
    pub time: bool,

    /// Your location for --time, as LAT:LON in decimal degrees
    #[arg(short, long, value_name = "LAT:LON", allow_hyphen_values = true)]
    pub location: Option<Location>,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add new wallpapers from a directory to the database
    ///
    /// Files are recognised as images by their content. Each new image is
    /// measured and classified as night, twilight or day. Files already in
    /// the database are left alone, so scanning again is cheap.
    Scan {
        /// Directory to scan (defaults to the configured one)
        path: Option<PathBuf>,

        /// Also scan subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Set a random wallpaper and exit
    ///
    /// Never picks the wallpaper that is already set, as long as there is
    /// another one to choose from.
    Next {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Browse wallpapers interactively
    ///
    /// Sets a wallpaper right away, then waits for commands: <enter> for the
    /// next one, `d` to delete the current one, `o` to open it, `q` to quit.
    Interactive {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Show the number of wallpapers per brightness
    Stats,

    /// Generate shell completion scripts
    ///
    /// Example: nextwall completion bash > ~/.local/share/bash-completion/completions/nextwall
    Completion {
        /// The shell to generate completions for
        shell: Shell,
    },
}
